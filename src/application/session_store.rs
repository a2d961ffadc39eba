// Store trait for render sessions
use crate::application::session::RenderSession;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedSession = Arc<Mutex<RenderSession>>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reserve a fresh session id
    async fn next_id(&self) -> u64;

    async fn insert(&self, session: RenderSession) -> SharedSession;

    async fn get(&self, id: u64) -> Option<SharedSession>;

    /// Remove and return a session
    async fn remove(&self, id: u64) -> Option<SharedSession>;

    async fn len(&self) -> usize;

    /// Remove sessions created at or before `created_before`, then the oldest ones until
    /// at most `capacity` remain. Returns the removed ids.
    async fn evict(&self, created_before: DateTime<Utc>, capacity: usize) -> Vec<u64>;
}
