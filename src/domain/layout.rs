// Chart sizing and stacked-axis geometry
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::chart::{Axis, Grid, Layout, Title};

const VIEWPORT_FILL: f64 = 0.9;
const ASPECT_WIDTH: f64 = 7.0;
const ASPECT_HEIGHT: f64 = 4.5;
const MIN_CAPPED_HEIGHT: f64 = 300.0;
const BASE_TITLE_FONT: i32 = 13;

pub const DEFAULT_X_AXIS_TITLE: &str = "Time (min)";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Chart size for a viewport: 90% of the width at a fixed 7:4.5 aspect,
/// switching to 90% of the height when the chart would not fit vertically.
pub fn compute_dimensions(viewport: Viewport) -> Dimensions {
    let mut width = viewport.width * VIEWPORT_FILL;
    let mut height = width * ASPECT_HEIGHT / ASPECT_WIDTH;
    if height > viewport.height * VIEWPORT_FILL && height > MIN_CAPPED_HEIGHT {
        height = viewport.height * VIEWPORT_FILL;
        width = height * ASPECT_WIDTH / ASPECT_HEIGHT;
    }
    Dimensions { width, height }
}

#[derive(Debug, Clone)]
pub struct AxisLayoutOptions {
    pub show_legend: bool,
    pub x_axis_title: String,
}

impl Default for AxisLayoutOptions {
    fn default() -> Self {
        Self {
            show_legend: false,
            x_axis_title: DEFAULT_X_AXIS_TITLE.to_string(),
        }
    }
}

impl AxisLayoutOptions {
    pub fn with_legend() -> Self {
        Self {
            show_legend: true,
            ..Default::default()
        }
    }

    pub fn x_axis(mut self, title: impl Into<String>) -> Self {
        self.x_axis_title = title.into();
        self
    }
}

/// `(start, end)` of stacked band `index` out of `count`: 4-unit bands, 1-unit gaps,
/// bottom to top.
pub fn axis_domain(index: usize, count: usize) -> (f64, f64) {
    let split = count as f64 * 5.0 - 1.0;
    let start = index as f64 * 5.0 / split;
    (start, start + 4.0 / split)
}

/// Layout with one y-axis per title stacked over a shared x-axis.
///
/// `axis_titles` must not be empty.
pub fn compute_axis_layout(
    chart_title: &str,
    axis_titles: &[&str],
    options: &AxisLayoutOptions,
    dimensions: Dimensions,
) -> Layout {
    let count = axis_titles.len();
    let font_size = BASE_TITLE_FONT - count as i32;

    let mut axes = BTreeMap::new();
    axes.insert("xaxis".to_string(), Axis::titled(options.x_axis_title.as_str()));
    for (i, title) in axis_titles.iter().enumerate() {
        let (start, end) = axis_domain(i, count);
        axes.insert(
            format!("yaxis{}", i + 1),
            Axis::titled(*title)
                .with_domain(start, end)
                .with_font_size(font_size),
        );
    }

    Layout {
        showlegend: options.show_legend,
        title: Title {
            text: chart_title.to_string(),
        },
        grid: Grid::stacked(count),
        axes,
        annotations: Vec::new(),
        shapes: Vec::new(),
        width: dimensions.width,
        height: dimensions.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_dimensions_follow_width() {
        let dims = compute_dimensions(Viewport {
            width: 1000.0,
            height: 1000.0,
        });
        assert_eq!(dims.width, 900.0);
        assert!((dims.width / dims.height - 7.0 / 4.5).abs() < EPS);
    }

    #[test]
    fn test_dimensions_capped_by_height() {
        let dims = compute_dimensions(Viewport {
            width: 2000.0,
            height: 600.0,
        });
        assert!((dims.height - 540.0).abs() < EPS);
        assert!((dims.width - 540.0 * 7.0 / 4.5).abs() < EPS);
        assert!((dims.width / dims.height - 7.0 / 4.5).abs() < EPS);
    }

    #[test]
    fn test_small_heights_are_not_capped() {
        // height 289.3 < 300, so the width-derived size stands even though it overflows
        let dims = compute_dimensions(Viewport {
            width: 500.0,
            height: 200.0,
        });
        assert_eq!(dims.width, 450.0);
        assert!((dims.height - 450.0 * 4.5 / 7.0).abs() < EPS);
    }

    #[test]
    fn test_axis_domains_stack_without_overlap() {
        for count in 1..=3 {
            let bands: Vec<_> = (0..count).map(|i| axis_domain(i, count)).collect();
            let split = count as f64 * 5.0 - 1.0;
            for pair in bands.windows(2) {
                assert!(pair[0].1 < pair[1].0);
                assert!(pair[0].0 < pair[1].0);
            }
            let (last_start, last_end) = bands[count - 1];
            assert!((last_end - last_start - 4.0 / split).abs() < EPS);
            assert!((last_end - 1.0).abs() < EPS);
        }
        assert_eq!(axis_domain(0, 1), (0.0, 1.0));
        let (s, e) = axis_domain(1, 2);
        assert!((s - 5.0 / 9.0).abs() < EPS && (e - 1.0).abs() < EPS);
    }

    #[test]
    fn test_axis_layout() {
        let dims = Dimensions {
            width: 700.0,
            height: 450.0,
        };
        let layout = compute_axis_layout(
            "Vehicle States",
            &["Distance (mi)", "Velocity (mph)", "Acceleration (m/s^2)"],
            &AxisLayoutOptions::default(),
            dims,
        );

        assert!(!layout.showlegend);
        assert_eq!(layout.grid.rows, 3);
        assert_eq!(layout.y_axis_count(), 3);
        assert_eq!(layout.axis("xaxis").unwrap().title.text, DEFAULT_X_AXIS_TITLE);
        let top = layout.axis("yaxis3").unwrap();
        assert_eq!(top.title.text, "Acceleration (m/s^2)");
        assert_eq!(top.title.font.as_ref().unwrap().size, 10);
        assert_eq!(layout.width, 700.0);
    }

    #[test]
    fn test_axis_layout_options() {
        let options = AxisLayoutOptions::with_legend().x_axis("Bus Current (A)");
        let layout = compute_axis_layout(
            "t",
            &["Bus Voltage (V)"],
            &options,
            Dimensions {
                width: 1.0,
                height: 1.0,
            },
        );
        assert!(layout.showlegend);
        assert_eq!(layout.axis("xaxis").unwrap().title.text, "Bus Current (A)");
        assert_eq!(layout.axis("yaxis1").unwrap().title.font.as_ref().unwrap().size, 12);
    }
}
