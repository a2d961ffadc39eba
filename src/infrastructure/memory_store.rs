// In-memory session store
use crate::application::session::RenderSession;
use crate::application::session_store::{SessionStore, SharedSession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

struct StoredSession {
    created_at: DateTime<Utc>,
    session: SharedSession,
}

#[derive(Default)]
pub struct InMemorySessionStore {
    next_id: AtomicU64,
    sessions: RwLock<HashMap<u64, StoredSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn insert(&self, session: RenderSession) -> SharedSession {
        let id = session.id();
        let created_at = session.created_at();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(
            id,
            StoredSession {
                created_at,
                session: shared.clone(),
            },
        );
        tracing::debug!("Stored session {}", id);
        shared
    }

    async fn get(&self, id: u64) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).map(|s| s.session.clone())
    }

    async fn remove(&self, id: u64) -> Option<SharedSession> {
        self.sessions.write().await.remove(&id).map(|s| s.session)
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn evict(&self, created_before: DateTime<Utc>, capacity: usize) -> Vec<u64> {
        let mut sessions = self.sessions.write().await;
        let mut evicted: Vec<u64> = sessions
            .iter()
            .filter(|(_, s)| s.created_at <= created_before)
            .map(|(id, _)| *id)
            .collect();
        for id in &evicted {
            sessions.remove(id);
        }

        if sessions.len() > capacity {
            let mut by_age: Vec<(DateTime<Utc>, u64)> =
                sessions.iter().map(|(id, s)| (s.created_at, *id)).collect();
            by_age.sort();
            let excess = sessions.len() - capacity;
            for (_, id) in by_age.into_iter().take(excess) {
                sessions.remove(&id);
                evicted.push(id);
            }
        }
        evicted
    }
}
