// Render pipeline - Ordered, cooperatively scheduled chart construction per record
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, Mutex};

use crate::application::series_builder::{build_chart, raw_signal};
use crate::domain::chart::{ChartContainer, ChartKind};
use crate::domain::layout::Dimensions;
use crate::domain::telemetry::TelemetryRecord;

pub const SHOW_RAW_LABEL: &str = "Show Raw Plots";
pub const HIDE_RAW_LABEL: &str = "Hide Raw Plots";

/// Progress of a render, streamed to the client as charts are attached.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderEvent {
    SessionCreated {
        session: u64,
        records: usize,
        visible: bool,
    },
    RecordStarted {
        record: usize,
        container: String,
    },
    ChartAttached {
        record: usize,
        kind: ChartKind,
        chart: ChartContainer,
    },
    GalleryAttached {
        record: usize,
        gallery: String,
    },
    RawChartAttached {
        record: usize,
        gallery: String,
        signal: String,
        chart: ChartContainer,
    },
    RecordFinished {
        record: usize,
        charts: usize,
    },
    Complete {
        records: usize,
        duration_ms: i64,
    },
}

/// Collapsible set of raw signal charts. Starts visible.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryContainer {
    pub id: String,
    pub visible: bool,
    pub charts: Vec<ChartContainer>,
}

impl GalleryContainer {
    pub fn new(id: String) -> Self {
        Self {
            id,
            visible: true,
            charts: Vec::new(),
        }
    }

    /// Flip visibility, returning the new state.
    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    pub fn button_label(&self) -> &'static str {
        if self.visible { HIDE_RAW_LABEL } else { SHOW_RAW_LABEL }
    }
}

/// Everything rendered for one telemetry record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordContainer {
    pub id: String,
    pub charts: Vec<ChartContainer>,
    pub gallery: Option<GalleryContainer>,
}

impl RecordContainer {
    pub fn new(id: String) -> Self {
        Self {
            id,
            charts: Vec::new(),
            gallery: None,
        }
    }

    /// Top-level children: fixed charts plus the gallery, if any.
    pub fn child_count(&self) -> usize {
        self.charts.len() + usize::from(self.gallery.is_some())
    }

    pub fn relayout(&mut self, dimensions: Dimensions) {
        for chart in self.charts.iter_mut() {
            chart.relayout(dimensions);
        }
        if let Some(gallery) = self.gallery.as_mut() {
            for chart in gallery.charts.iter_mut() {
                chart.relayout(dimensions);
            }
        }
    }
}

pub type SharedRecord = Arc<Mutex<RecordContainer>>;

/// Builds the chart sequence for each record. Owns the gallery id counter, so ids stay
/// unique across every render this instance performs.
#[derive(Debug, Default)]
pub struct RenderPipeline {
    next_gallery: u64,
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_gallery_id(&mut self) -> String {
        let id = format!("rawPlotsContainer{}", self.next_gallery);
        self.next_gallery += 1;
        id
    }

    /// Create one container per record and start filling them.
    ///
    /// All records run on a single task: each record's stages are strictly sequential,
    /// and records interleave only at the yield between stages. Every stage sizes its
    /// chart from the latest value in `dimensions`.
    pub fn render(
        &mut self,
        records: Vec<TelemetryRecord>,
        dimensions: watch::Receiver<Dimensions>,
        tx: mpsc::Sender<RenderEvent>,
    ) -> Vec<SharedRecord> {
        let start_time = Instant::now();
        let total = records.len();
        let mut containers = Vec::with_capacity(total);
        let mut jobs = Vec::with_capacity(total);

        for (index, record) in records.into_iter().enumerate() {
            let container = Arc::new(Mutex::new(RecordContainer::new(format!("plot{}", index))));
            let gallery_id = record.has_raw_signals().then(|| self.allocate_gallery_id());
            containers.push(container.clone());
            jobs.push(render_record(
                index,
                record,
                dimensions.clone(),
                gallery_id,
                container,
                tx.clone(),
            ));
        }

        tokio::spawn(async move {
            join_all(jobs).await;
            let duration_ms = start_time.elapsed().as_millis() as i64;
            tracing::info!("Rendered {} record(s) in {} ms", total, duration_ms);
            let _ = tx
                .send(RenderEvent::Complete {
                    records: total,
                    duration_ms,
                })
                .await;
        });

        containers
    }
}

/// Attach `chart` at the dimensions current when the container is locked. A resize
/// updates `dimensions` before relaying the containers, so no chart misses it.
async fn attach(
    container: &SharedRecord,
    dimensions: &watch::Receiver<Dimensions>,
    mut chart: ChartContainer,
    to_gallery: bool,
) -> ChartContainer {
    let mut container = container.lock().await;
    chart.relayout(*dimensions.borrow());
    if to_gallery {
        if let Some(gallery) = container.gallery.as_mut() {
            gallery.charts.push(chart.clone());
        }
    } else {
        container.charts.push(chart.clone());
    }
    chart
}

async fn render_record(
    index: usize,
    record: TelemetryRecord,
    dimensions: watch::Receiver<Dimensions>,
    gallery_id: Option<String>,
    container: SharedRecord,
    tx: mpsc::Sender<RenderEvent>,
) {
    let container_id = container.lock().await.id.clone();
    let _ = tx
        .send(RenderEvent::RecordStarted {
            record: index,
            container: container_id.clone(),
        })
        .await;

    for kind in ChartKind::FIXED_ORDER {
        tokio::task::yield_now().await;
        let current = *dimensions.borrow();
        let chart = ChartContainer::new(
            format!("{}-{}", container_id, kind.slug()),
            build_chart(kind, &record, current),
        );
        let chart = attach(&container, &dimensions, chart, false).await;
        tracing::debug!("Attached {:?} to {}", kind, container_id);
        let _ = tx
            .send(RenderEvent::ChartAttached {
                record: index,
                kind,
                chart,
            })
            .await;
    }

    if let (Some(gallery_id), Some(mut signals)) = (gallery_id, record.raw_signals()) {
        tokio::task::yield_now().await;
        signals.normalize_in_place();
        container.lock().await.gallery = Some(GalleryContainer::new(gallery_id.clone()));
        let _ = tx
            .send(RenderEvent::GalleryAttached {
                record: index,
                gallery: gallery_id.clone(),
            })
            .await;

        let names: Vec<String> = signals.signal_names().map(str::to_string).collect();
        for name in names {
            tokio::task::yield_now().await;
            let current = *dimensions.borrow();
            let chart = ChartContainer::new(
                format!("{}-{}", gallery_id, name),
                raw_signal(&signals, &name, current),
            );
            let chart = attach(&container, &dimensions, chart, true).await;
            let _ = tx
                .send(RenderEvent::RawChartAttached {
                    record: index,
                    gallery: gallery_id.clone(),
                    signal: name,
                    chart,
                })
                .await;
        }
    }

    let charts = container.lock().await.child_count();
    let _ = tx
        .send(RenderEvent::RecordFinished {
            record: index,
            charts,
        })
        .await;
}
