// Chart specification domain models (Plotly-shaped when serialized)
use serde::Serialize;
use std::collections::BTreeMap;

use super::layout::Dimensions;

pub const GRAY: &str = "rgb(204, 204, 204)";
pub const GREEN: &str = "rgb(0, 170, 0)";
pub const RED: &str = "rgb(255, 0, 0)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Scatter,
    /// GPU-accelerated scatter, used where point counts get large
    Scattergl,
    Bar,
    Histogram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceMode {
    Lines,
    Markers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dash {
    Dash,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<Dash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

impl LineStyle {
    pub fn colored(color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            ..Default::default()
        }
    }

    pub fn dashed() -> Self {
        Self {
            dash: Some(Dash::Dash),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MarkerColor {
    Solid(String),
    Scale(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub color: MarkerColor,
}

/// Explicit histogram binning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bins {
    pub start: f64,
    pub end: f64,
    pub size: f64,
}

/// One plotted data series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub x: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub y: Vec<f64>,
    #[serde(rename = "type")]
    pub kind: TraceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<TraceMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xbins: Option<Bins>,
}

impl Trace {
    fn new(kind: TraceKind, mode: Option<TraceMode>, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            x,
            y,
            kind,
            mode,
            name: None,
            xaxis: None,
            yaxis: None,
            showlegend: None,
            line: None,
            marker: None,
            xbins: None,
        }
    }

    pub fn lines(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self::new(TraceKind::Scatter, Some(TraceMode::Lines), x, y)
    }

    pub fn gl_lines(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self::new(TraceKind::Scattergl, Some(TraceMode::Lines), x, y)
    }

    pub fn gl_markers(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self::new(TraceKind::Scattergl, Some(TraceMode::Markers), x, y)
    }

    pub fn bar(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self::new(TraceKind::Bar, None, x, y)
    }

    pub fn histogram(samples: Vec<f64>) -> Self {
        Self::new(TraceKind::Histogram, None, samples, Vec::new())
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Assign the trace to y-axis `index` (1-based). Axis 1 is the default and left implicit.
    pub fn on_y_axis(mut self, index: usize) -> Self {
        self.yaxis = (index > 1).then(|| format!("y{}", index));
        self
    }

    pub fn on_x_axis(mut self, index: usize) -> Self {
        self.xaxis = (index > 1).then(|| format!("x{}", index));
        self
    }

    pub fn with_line(mut self, line: LineStyle) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_marker(mut self, color: MarkerColor) -> Self {
        self.marker = Some(MarkerStyle { color });
        self
    }

    pub fn hide_legend(mut self) -> Self {
        self.showlegend = Some(false);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub size: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTitle {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standoff: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    pub title: AxisTitle,
}

impl Axis {
    pub fn titled(text: impl Into<String>) -> Self {
        Self {
            domain: None,
            anchor: None,
            title: AxisTitle {
                text: text.into(),
                font: None,
                standoff: None,
            },
        }
    }

    pub fn with_domain(mut self, start: f64, end: f64) -> Self {
        self.domain = Some([start, end]);
        self
    }

    pub fn with_font_size(mut self, size: i32) -> Self {
        self.title.font = Some(Font { size });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub rows: usize,
    pub columns: usize,
    pub pattern: &'static str,
}

impl Grid {
    pub fn stacked(rows: usize) -> Self {
        Self {
            rows,
            columns: 1,
            pattern: "independent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub showarrow: bool,
    pub yshift: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub line: LineStyle,
}

impl Shape {
    /// Vertical dashed line at `x` spanning `0..=height`.
    pub fn vertical_dashed(x: f64, height: f64, color: &str) -> Self {
        Self {
            kind: "line",
            x0: x,
            x1: x,
            y0: 0.0,
            y1: height,
            line: LineStyle {
                color: Some(color.to_string()),
                dash: Some(Dash::Dash),
                width: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub showlegend: bool,
    pub title: Title,
    pub grid: Grid,
    /// Keyed by Plotly axis name: `xaxis`, `xaxis2`, `yaxis1`, ...
    #[serde(flatten)]
    pub axes: BTreeMap<String, Axis>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<Shape>,
    pub width: f64,
    pub height: f64,
}

impl Layout {
    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.get(name)
    }

    pub fn y_axis_count(&self) -> usize {
        self.axes.keys().filter(|k| k.starts_with("yaxis")).count()
    }
}

/// Immutable chart descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub traces: Vec<Trace>,
    pub layout: Layout,
}

impl ChartSpec {
    pub fn new(traces: Vec<Trace>, layout: Layout) -> Self {
        Self { traces, layout }
    }

    pub fn title(&self) -> &str {
        &self.layout.title.text
    }
}

/// The fixed chart types, in mandatory render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    States,
    PowerTorque,
    Charge,
    PackResistance,
    ModuleVoltages,
    PackStats,
    DrivetrainEfficiency,
    Solar,
    Vtp,
    VelocityPhaseThrottle,
    SpeedContour,
}

impl ChartKind {
    pub const FIXED_ORDER: [ChartKind; 11] = [
        ChartKind::States,
        ChartKind::PowerTorque,
        ChartKind::Charge,
        ChartKind::PackResistance,
        ChartKind::ModuleVoltages,
        ChartKind::PackStats,
        ChartKind::DrivetrainEfficiency,
        ChartKind::Solar,
        ChartKind::Vtp,
        ChartKind::VelocityPhaseThrottle,
        ChartKind::SpeedContour,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ChartKind::States => "states",
            ChartKind::PowerTorque => "power-torque",
            ChartKind::Charge => "charge",
            ChartKind::PackResistance => "pack-resistance",
            ChartKind::ModuleVoltages => "module-voltages",
            ChartKind::PackStats => "pack-stats",
            ChartKind::DrivetrainEfficiency => "drivetrain-efficiency",
            ChartKind::Solar => "solar",
            ChartKind::Vtp => "vtp",
            ChartKind::VelocityPhaseThrottle => "velocity-phase-throttle",
            ChartKind::SpeedContour => "speed-contour",
        }
    }
}

/// A chart attached to a record or gallery container.
#[derive(Debug, Clone, Serialize)]
pub struct ChartContainer {
    pub id: String,
    pub spec: ChartSpec,
}

impl ChartContainer {
    pub fn new(id: String, spec: ChartSpec) -> Self {
        Self { id, spec }
    }

    /// Apply new dimensions without touching trace data.
    pub fn relayout(&mut self, dimensions: Dimensions) {
        self.spec.layout.width = dimensions.width;
        self.spec.layout.height = dimensions.height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_serializes_plotly_shape() {
        let trace = Trace::lines(vec![0.0, 1.0], vec![2.0, 3.0])
            .named("Velocity")
            .on_y_axis(2)
            .with_line(LineStyle::dashed());
        let json = serde_json::to_value(&trace).unwrap();

        assert_eq!(json["type"], "scatter");
        assert_eq!(json["mode"], "lines");
        assert_eq!(json["yaxis"], "y2");
        assert_eq!(json["line"]["dash"], "dash");
        assert!(json.get("xaxis").is_none());
        assert!(json.get("showlegend").is_none());
    }

    #[test]
    fn test_first_axis_is_implicit() {
        let trace = Trace::lines(vec![], vec![]).on_y_axis(1).on_x_axis(1);
        assert_eq!(trace.yaxis, None);
        assert_eq!(trace.xaxis, None);
    }

    #[test]
    fn test_histogram_has_no_y() {
        let json = serde_json::to_value(Trace::histogram(vec![1.0, 2.0])).unwrap();
        assert_eq!(json["type"], "histogram");
        assert!(json.get("y").is_none());
        assert!(json.get("mode").is_none());
    }

    #[test]
    fn test_layout_flattens_axes() {
        let mut axes = BTreeMap::new();
        axes.insert("xaxis".to_string(), Axis::titled("Time (min)"));
        axes.insert(
            "yaxis1".to_string(),
            Axis::titled("Power (W)").with_domain(0.0, 1.0).with_font_size(12),
        );
        let layout = Layout {
            showlegend: false,
            title: Title { text: "t".into() },
            grid: Grid::stacked(1),
            axes,
            annotations: Vec::new(),
            shapes: Vec::new(),
            width: 700.0,
            height: 450.0,
        };
        let json = serde_json::to_value(&layout).unwrap();

        assert_eq!(json["yaxis1"]["title"]["font"]["size"], 12);
        assert_eq!(json["xaxis"]["title"]["text"], "Time (min)");
        assert_eq!(json["grid"]["pattern"], "independent");
        assert!(json.get("shapes").is_none());
    }

    #[test]
    fn test_relayout_only_touches_dimensions() {
        let spec = ChartSpec::new(
            vec![Trace::lines(vec![1.0], vec![2.0])],
            Layout {
                showlegend: true,
                title: Title { text: "t".into() },
                grid: Grid::stacked(1),
                axes: BTreeMap::new(),
                annotations: Vec::new(),
                shapes: Vec::new(),
                width: 700.0,
                height: 450.0,
            },
        );
        let mut container = ChartContainer::new("c".into(), spec.clone());
        container.relayout(Dimensions {
            width: 1400.0,
            height: 900.0,
        });

        assert_eq!(container.spec.traces, spec.traces);
        assert_eq!(container.spec.layout.width, 1400.0);
        assert_eq!(container.spec.layout.height, 900.0);
        assert_eq!(container.spec.layout.title, spec.layout.title);
    }
}
