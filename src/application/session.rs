// Render sessions - one operator view of a backend response
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

use crate::application::render_pipeline::{RecordContainer, RenderEvent, RenderPipeline, SharedRecord};
use crate::application::session_store::{SessionStore, SharedSession};
use crate::application::viewport::{ViewportChange, ViewportTracker};
use crate::domain::error::{RenderError, Result};
use crate::domain::layout::{Dimensions, Viewport};
use crate::domain::response::{BackendResponse, RawDownload};
use crate::infrastructure::config::RendererSettings;

const EVENT_BUFFER: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewState {
    Inputs,
    Outputs,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryState {
    pub id: String,
    pub visible: bool,
    pub button_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub view: ViewState,
    pub charts_visible: bool,
    pub records: Vec<RecordContainer>,
}

pub struct RenderSession {
    id: u64,
    created_at: DateTime<Utc>,
    response: BackendResponse,
    view: ViewState,
    tracker: ViewportTracker,
    /// Read by the render pipeline before every stage
    dimensions: watch::Sender<Dimensions>,
    records: Vec<SharedRecord>,
}

impl RenderSession {
    pub fn new(
        id: u64,
        response: BackendResponse,
        tracker: ViewportTracker,
        dimensions: watch::Sender<Dimensions>,
        records: Vec<SharedRecord>,
    ) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            response,
            view: ViewState::Outputs,
            tracker,
            dimensions,
            records,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn download(&self) -> RawDownload {
        self.response.download()
    }

    /// Discard everything rendered and return to the input form. Stages still in
    /// flight finish into containers nobody holds anymore.
    pub fn go_back(&mut self) {
        self.records.clear();
        self.view = ViewState::Inputs;
    }

    /// Apply a viewport change. Ignored while the input form is showing.
    pub async fn resize(&mut self, viewport: Viewport) -> Option<ViewportChange> {
        if self.view == ViewState::Inputs {
            return None;
        }
        let change = self.tracker.resize(viewport);
        if let Some(dims) = change.relayout {
            // publish before relaying so stages still running attach at the new size
            self.dimensions.send_replace(dims);
            for record in &self.records {
                record.lock().await.relayout(dims);
            }
            tracing::debug!(
                "Session {} relaid {} record(s) at {:.0}x{:.0}",
                self.id,
                self.records.len(),
                dims.width,
                dims.height
            );
        }
        Some(change)
    }

    pub async fn toggle_gallery(&self, gallery_id: &str) -> Result<GalleryState> {
        for record in &self.records {
            let mut record = record.lock().await;
            if let Some(gallery) = record.gallery.as_mut().filter(|g| g.id == gallery_id) {
                let visible = gallery.toggle();
                return Ok(GalleryState {
                    id: gallery.id.clone(),
                    visible,
                    button_label: gallery.button_label(),
                });
            }
        }
        Err(RenderError::GalleryNotFound(gallery_id.to_string()))
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let mut records = Vec::with_capacity(self.records.len());
        for record in &self.records {
            records.push(record.lock().await.clone());
        }
        SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            view: self.view,
            charts_visible: self.tracker.charts_visible(),
            records,
        }
    }
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    pipeline: Arc<Mutex<RenderPipeline>>,
    settings: RendererSettings,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, settings: RendererSettings) -> Self {
        Self {
            store,
            pipeline: Arc::new(Mutex::new(RenderPipeline::new())),
            settings,
        }
    }

    /// Parse a backend response and start rendering it. Rejected or malformed
    /// responses create no session.
    pub async fn start(
        &self,
        response: BackendResponse,
        viewport: Option<Viewport>,
    ) -> Result<mpsc::Receiver<RenderEvent>> {
        let records = response.records()?;
        let viewport = viewport.unwrap_or(self.settings.default_viewport());
        let tracker = ViewportTracker::new(viewport, self.settings.min_chart_width);
        let id = self.store.next_id().await;
        let (dims_tx, dims_rx) = watch::channel(tracker.dimensions());

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let _ = tx
            .send(RenderEvent::SessionCreated {
                session: id,
                records: records.len(),
                visible: tracker.charts_visible(),
            })
            .await;

        tracing::info!("Session {}: rendering {} record(s)", id, records.len());
        let containers = self
            .pipeline
            .lock()
            .await
            .render(records, dims_rx, tx);
        self.store
            .insert(RenderSession::new(id, response, tracker, dims_tx, containers))
            .await;
        self.evict().await;
        Ok(rx)
    }

    /// Drop sessions past their time-to-live, then the oldest beyond the capacity.
    async fn evict(&self) {
        let ttl = TimeDelta::seconds(self.settings.session_ttl_secs as i64);
        let evicted = self
            .store
            .evict(Utc::now() - ttl, self.settings.max_sessions)
            .await;
        if !evicted.is_empty() {
            tracing::info!("Evicted session(s) {:?}", evicted);
        }
    }

    async fn session(&self, id: u64) -> Result<SharedSession> {
        self.evict().await;
        self.store.get(id).await.ok_or(RenderError::SessionNotFound(id))
    }

    pub async fn snapshot(&self, id: u64) -> Result<SessionSnapshot> {
        Ok(self.session(id).await?.lock().await.snapshot().await)
    }

    pub async fn download(&self, id: u64) -> Result<RawDownload> {
        Ok(self.session(id).await?.lock().await.download())
    }

    pub async fn resize(&self, id: u64, viewport: Viewport) -> Result<Option<ViewportChange>> {
        Ok(self.session(id).await?.lock().await.resize(viewport).await)
    }

    pub async fn toggle_gallery(&self, id: u64, gallery_id: &str) -> Result<GalleryState> {
        self.session(id).await?.lock().await.toggle_gallery(gallery_id).await
    }

    pub async fn go_back(&self, id: u64) -> Result<()> {
        let session = self
            .store
            .remove(id)
            .await
            .ok_or(RenderError::SessionNotFound(id))?;
        session.lock().await.go_back();
        tracing::info!("Session {} discarded", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_store::InMemorySessionStore;
    use bytes::Bytes;
    use tokio_stream::wrappers::ReceiverStream;
    use tokio_stream::StreamExt;

    const BODY: &str = r#"[{"time_min": [0, 1], "distance_mi": [0, 0.1],
        "raw_timestamps": [0, 60000], "raw_values": {"throttle": [0, 50]}},
        {"time_min": [0, 1]}]"#;

    fn service() -> SessionService {
        SessionService::new(
            Arc::new(InMemorySessionStore::new()),
            RendererSettings::default(),
        )
    }

    async fn started(service: &SessionService, viewport: Viewport) -> (u64, Vec<RenderEvent>) {
        let rx = service
            .start(BackendResponse::ok(BODY), Some(viewport))
            .await
            .unwrap();
        let events = ReceiverStream::new(rx).collect::<Vec<_>>().await;
        let id = match events.first() {
            Some(RenderEvent::SessionCreated { session, .. }) => *session,
            other => panic!("expected session event, got {:?}", other),
        };
        (id, events)
    }

    const WIDE: Viewport = Viewport {
        width: 1000.0,
        height: 1000.0,
    };

    #[tokio::test]
    async fn test_start_renders_every_record() {
        let service = service();
        let (id, events) = started(&service, WIDE).await;
        assert!(matches!(events.last(), Some(RenderEvent::Complete { records: 2, .. })));

        let snapshot = service.snapshot(id).await.unwrap();
        assert_eq!(snapshot.view, ViewState::Outputs);
        assert!(snapshot.charts_visible);
        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.records[0].child_count(), 12);
        assert_eq!(snapshot.records[1].child_count(), 11);
        assert_eq!(snapshot.records[0].charts[0].spec.layout.width, 900.0);
    }

    #[tokio::test]
    async fn test_rejected_response_creates_no_session() {
        let service = service();
        let rejected = BackendResponse::new(500, Bytes::from_static(b"boom"));
        let err = service.start(rejected, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Request failed:\nboom");

        let malformed = BackendResponse::ok("not json");
        assert!(matches!(
            service.start(malformed, None).await,
            Err(RenderError::MalformedResponse(_))
        ));
        assert_eq!(service.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_download_passes_body_through() {
        let service = service();
        let (id, _) = started(&service, WIDE).await;
        let download = service.download(id).await.unwrap();
        assert_eq!(&download.bytes[..], BODY.as_bytes());
        assert_eq!(download.filename, "recontool_raw.json");
    }

    #[tokio::test]
    async fn test_resize_relayouts_without_rebuilding() {
        let service = service();
        let (id, _) = started(&service, WIDE).await;
        let before = service.snapshot(id).await.unwrap();

        let change = service
            .resize(
                id,
                Viewport {
                    width: 1200.0,
                    height: 1000.0,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.relayout.map(|d| d.width), Some(1080.0));

        let after = service.snapshot(id).await.unwrap();
        let chart_before = &before.records[0].charts[0].spec;
        let chart_after = &after.records[0].charts[0].spec;
        assert_eq!(chart_after.layout.width, 1080.0);
        assert_eq!(chart_after.traces, chart_before.traces);
        let gallery = after.records[0].gallery.as_ref().unwrap();
        assert_eq!(gallery.charts[0].spec.layout.width, 1080.0);
    }

    #[tokio::test]
    async fn test_small_screen_hides_charts() {
        let service = service();
        let (id, events) = started(
            &service,
            Viewport {
                width: 400.0,
                height: 800.0,
            },
        )
        .await;
        assert!(matches!(
            events.first(),
            Some(RenderEvent::SessionCreated { visible: false, .. })
        ));
        let change = service.resize(id, WIDE).await.unwrap().unwrap();
        assert!(change.charts_visible && change.visibility_changed);
    }

    #[tokio::test]
    async fn test_toggle_gallery() {
        let service = service();
        let (id, _) = started(&service, WIDE).await;
        let snapshot = service.snapshot(id).await.unwrap();
        let gallery_id = snapshot.records[0].gallery.as_ref().unwrap().id.clone();

        let hidden = service.toggle_gallery(id, &gallery_id).await.unwrap();
        assert!(!hidden.visible);
        assert_eq!(hidden.button_label, "Show Raw Plots");
        let shown = service.toggle_gallery(id, &gallery_id).await.unwrap();
        assert_eq!(shown.button_label, "Hide Raw Plots");

        assert!(matches!(
            service.toggle_gallery(id, "rawPlotsContainer99").await,
            Err(RenderError::GalleryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_go_back_discards_session() {
        let service = service();
        let (id, _) = started(&service, WIDE).await;
        let session = service.store.get(id).await.unwrap();

        service.go_back(id).await.unwrap();
        {
            let mut session = session.lock().await;
            assert_eq!(session.view(), ViewState::Inputs);
            assert!(session.resize(WIDE).await.is_none());
            assert!(session.snapshot().await.records.is_empty());
        }
        assert!(matches!(
            service.snapshot(id).await,
            Err(RenderError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_gallery_ids_continue_across_sessions() {
        let service = service();
        let (first, _) = started(&service, WIDE).await;
        let (second, _) = started(&service, WIDE).await;
        assert_ne!(first, second);

        let gallery = |s: SessionSnapshot| s.records[0].gallery.as_ref().unwrap().id.clone();
        assert_eq!(gallery(service.snapshot(first).await.unwrap()), "rawPlotsContainer0");
        assert_eq!(gallery(service.snapshot(second).await.unwrap()), "rawPlotsContainer1");
    }

    #[tokio::test]
    async fn test_resize_during_render_sizes_later_charts() {
        let service = service();
        let rx = service
            .start(BackendResponse::ok(BODY), Some(WIDE))
            .await
            .unwrap();
        let wider = Viewport {
            width: 1200.0,
            height: 1000.0,
        };
        let change = service.resize(0, wider).await.unwrap().unwrap();
        assert_eq!(change.relayout.map(|d| d.width), Some(1080.0));
        let _ = ReceiverStream::new(rx).collect::<Vec<_>>().await;

        let snapshot = service.snapshot(0).await.unwrap();
        for record in &snapshot.records {
            assert!(record.charts.iter().all(|c| c.spec.layout.width == 1080.0));
        }
        let gallery = snapshot.records[0].gallery.as_ref().unwrap();
        assert!(gallery.charts.iter().all(|c| c.spec.layout.width == 1080.0));

        let again = service.resize(0, wider).await.unwrap().unwrap();
        assert_eq!(again.relayout, None);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_not_found() {
        let service = SessionService::new(
            Arc::new(InMemorySessionStore::new()),
            RendererSettings {
                session_ttl_secs: 0,
                ..RendererSettings::default()
            },
        );
        let rx = service.start(BackendResponse::ok("[]"), None).await.unwrap();
        let _ = ReceiverStream::new(rx).collect::<Vec<_>>().await;
        assert!(matches!(
            service.snapshot(0).await,
            Err(RenderError::SessionNotFound(0))
        ));
        assert_eq!(service.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_oldest_session_evicted_over_capacity() {
        let service = SessionService::new(
            Arc::new(InMemorySessionStore::new()),
            RendererSettings {
                max_sessions: 1,
                ..RendererSettings::default()
            },
        );
        let (first, _) = started(&service, WIDE).await;
        let (second, _) = started(&service, WIDE).await;

        assert!(matches!(
            service.download(first).await,
            Err(RenderError::SessionNotFound(_))
        ));
        assert!(service.download(second).await.is_ok());
    }
}
