// Viewport tracking - chart visibility and relayout on resize
use serde::Serialize;

use crate::domain::layout::{compute_dimensions, Dimensions, Viewport};

/// Outcome of one resize event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportChange {
    /// Whether charts are shown (false means the "screen too small" notice is).
    pub charts_visible: bool,
    /// Set when visibility flipped with this event.
    pub visibility_changed: bool,
    /// New dimensions to apply to every attached chart, if any work is needed.
    pub relayout: Option<Dimensions>,
}

#[derive(Debug, Clone)]
pub struct ViewportTracker {
    min_chart_width: f64,
    applied: Dimensions,
    small: bool,
}

impl ViewportTracker {
    /// Start tracking from the viewport the charts were first built for.
    pub fn new(viewport: Viewport, min_chart_width: f64) -> Self {
        let applied = compute_dimensions(viewport);
        Self {
            min_chart_width,
            applied,
            small: applied.width < min_chart_width,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.applied
    }

    pub fn charts_visible(&self) -> bool {
        !self.small
    }

    /// Handle a resize. Repeated events with an unchanged chart width do no work.
    pub fn resize(&mut self, viewport: Viewport) -> ViewportChange {
        let dims = compute_dimensions(viewport);
        let small = dims.width < self.min_chart_width;
        let visibility_changed = small != self.small;
        self.small = small;

        // hidden charts are relaid once they become visible again
        let relayout = if small || dims.width == self.applied.width {
            None
        } else {
            self.applied = dims;
            Some(dims)
        };

        ViewportChange {
            charts_visible: !small,
            visibility_changed,
            relayout,
        }
    }
}
