// Series builder - maps telemetry record fields onto chart specifications
use std::collections::BTreeMap;

use crate::application::statistical_overlay::{self, AutoBinner, PackStatistics};
use crate::domain::chart::{
    Annotation, Axis, ChartKind, ChartSpec, Grid, Layout, LineStyle, MarkerColor, Title, Trace,
    GRAY, GREEN, RED,
};
use crate::domain::layout::{compute_axis_layout, AxisLayoutOptions, Dimensions};
use crate::domain::telemetry::{RawSignals, TelemetryRecord};

const MILLIOHMS_PER_OHM: f64 = 1000.0;
const FIT_LINE_WIDTH: f64 = 5.0;
const PACK_STATS_FONT: i32 = 11;

/// Build one of the fixed charts for `record`.
pub fn build_chart(kind: ChartKind, record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    match kind {
        ChartKind::States => states(record, dims),
        ChartKind::PowerTorque => power_torque(record, dims),
        ChartKind::Charge => charge(record, dims),
        ChartKind::PackResistance => pack_resistance(record, dims),
        ChartKind::ModuleVoltages => module_voltages(record, dims),
        ChartKind::PackStats => pack_stats(record, dims),
        ChartKind::DrivetrainEfficiency => drivetrain_efficiency(record, dims),
        ChartKind::Solar => solar(record, dims),
        ChartKind::Vtp => vtp(record, dims),
        ChartKind::VelocityPhaseThrottle => velocity_phase_throttle(record, dims),
        ChartKind::SpeedContour => speed_contour(record, dims),
    }
}

/// `metric` against `time_min`. Lengths are not checked; a short series gives a partial trace.
fn time_series(record: &TelemetryRecord, metric: &str) -> Trace {
    Trace::lines(record.time_min().to_vec(), record.series(metric).to_vec())
}

/// Horizontal dashed line at `value` spanning the first to last sample time.
fn reference_line(record: &TelemetryRecord, value: Option<f64>, name: &str) -> Trace {
    let time = record.time_min();
    let (x, y) = match (time.first(), time.last(), value) {
        (Some(&first), Some(&last), Some(value)) => (vec![first, last], vec![value, value]),
        _ => (Vec::new(), Vec::new()),
    };
    Trace::lines(x, y).with_line(LineStyle::dashed()).named(name)
}

pub fn states(record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    let traces = vec![
        time_series(record, "distance_mi"),
        time_series(record, "velocity_mph").on_y_axis(2),
        time_series(record, "acceleration").on_y_axis(3),
    ];
    let layout = compute_axis_layout(
        "Vehicle States",
        &["Distance (mi)", "Velocity (mph)", "Acceleration (m/s^2)"],
        &AxisLayoutOptions::default(),
        dims,
    );
    ChartSpec::new(traces, layout)
}

pub fn power_torque(record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    let traces = vec![
        time_series(record, "model_derived_torque")
            .named("Model-Derived Torque")
            .on_y_axis(2),
        reference_line(record, record.scalar("max_torque"), "Max Torque").on_y_axis(2),
        time_series(record, "motor_power").named("Torque-Derived Power"),
        time_series(record, "model_derived_power").named("Model-Derived Power"),
        time_series(record, "bus_power").named("Measured Power"),
    ];
    let layout = compute_axis_layout(
        "Power and Torque",
        &["Power (W)", "Torque (N-m)"],
        &AxisLayoutOptions::with_legend(),
        dims,
    );
    ChartSpec::new(traces, layout)
}

pub fn charge(record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    let traces = vec![
        time_series(record, "simulated_total_charge").named("Simulated Total"),
        time_series(record, "simulated_net_charge").named("Simulated Net"),
        time_series(record, "measured_total_charge").named("Measured Out"),
        time_series(record, "measured_net_charge").named("Measured Net"),
        reference_line(record, record.scalar("pack_capacity"), "Pack Maximum"),
    ];
    let layout = compute_axis_layout(
        "Charge Consumed",
        &["Charge (A-hr)"],
        &AxisLayoutOptions::with_legend(),
        dims,
    );
    ChartSpec::new(traces, layout)
}

/// Truncate (not round) the decimal rendering of `value` to `digits` fractional digits.
fn truncated_decimal(value: f64, digits: usize) -> String {
    let text = value.to_string();
    match text.split_once('.') {
        Some((whole, fraction)) => {
            let fraction: String = fraction.chars().take(digits).collect();
            format!("{}.{}", whole, fraction)
        }
        None => text,
    }
}

fn integer_part(value: f64) -> String {
    let text = value.to_string();
    match text.split_once('.') {
        Some((whole, _)) => whole.to_string(),
        None => text,
    }
}

/// Current range for the fitted line. Both ends start at zero so the line always crosses I = 0.
pub fn current_extent(currents: &[f64]) -> (f64, f64) {
    currents
        .iter()
        .fold((0.0_f64, 0.0_f64), |(lo, hi), &i| (lo.min(i), hi.max(i)))
}

pub fn pack_resistance(record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    let currents = record.series("bms_current");
    let mut traces = vec![Trace::gl_markers(
        currents.to_vec(),
        record.series("bus_voltage").to_vec(),
    )];

    let resistance = record.scalar("pack_resistance");
    let intercept = record.scalar("pack_y_intercept");
    let (fit_x, fit_y) = match (resistance, intercept) {
        (Some(r), Some(b)) => {
            let (imin, imax) = current_extent(currents);
            (vec![imin, 0.0, imax], vec![b - imin * r, b, b - imax * r])
        }
        _ => (Vec::new(), Vec::new()),
    };
    traces.push(Trace::gl_lines(fit_x, fit_y).with_line(LineStyle {
        width: Some(FIT_LINE_WIDTH),
        ..Default::default()
    }));

    let title = match resistance {
        Some(r) => format!(
            "Pack Resistance: {} mΩ",
            truncated_decimal(r * MILLIOHMS_PER_OHM, 3)
        ),
        None => "Pack Resistance".to_string(),
    };
    let layout = compute_axis_layout(
        &title,
        &["Bus Voltage (V)"],
        &AxisLayoutOptions::default().x_axis("Bus Current (A)"),
        dims,
    );
    ChartSpec::new(traces, layout)
}

pub fn module_voltages(record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    let time = record.time_min();
    let max_mode = record.scalar("max_module_mode");
    let min_mode = record.scalar("min_module_mode");

    let mut traces = Vec::new();
    let mut max_trace = None;
    let mut min_trace = None;
    let mut first_raw = true;
    for (i, voltages) in record.matrix("module_voltages").iter().enumerate() {
        let module = Some((i + 1) as f64);
        let trace = Trace::lines(time.to_vec(), voltages.clone()).on_y_axis(3);
        if module == max_mode {
            max_trace = Some(trace.with_line(LineStyle::colored(GREEN)).named("Max"));
        } else if module == min_mode {
            min_trace = Some(trace.with_line(LineStyle::colored(RED)).named("Min"));
        } else {
            let trace = trace.with_line(LineStyle::colored(GRAY));
            if first_raw {
                first_raw = false;
                traces.push(trace.named("Raw"));
            } else {
                traces.push(trace.hide_legend());
            }
        }
    }
    traces.extend(max_trace);
    traces.extend(min_trace);
    traces.push(
        time_series(record, "max_min_difference")
            .named("Max-Min Difference")
            .on_y_axis(2),
    );
    traces.push(time_series(record, "max_module").named("Max Module"));
    traces.push(time_series(record, "min_module").named("Min Module"));

    let layout = compute_axis_layout(
        "Module Voltages",
        &["Min/Max Module", "Max-Min (V)", "Module Voltage (V)"],
        &AxisLayoutOptions::with_legend(),
        dims,
    );
    ChartSpec::new(traces, layout)
}

/// First draw of the pack statistics chart: per-module bars over a resistance histogram,
/// without the fitted curve.
pub fn pack_stats_base(record: &TelemetryRecord, dims: Dimensions) -> (ChartSpec, PackStatistics) {
    let milliohms: Vec<f64> = record
        .series("module_resistances")
        .iter()
        .map(|r| r * MILLIOHMS_PER_OHM)
        .collect();
    let stats = PackStatistics::new(
        &milliohms,
        record.scalar("mean_module_resistance").map(|m| m * MILLIOHMS_PER_OHM),
        record
            .scalar("module_standard_deviation")
            .map(|s| s * MILLIOHMS_PER_OHM),
    );

    let module_numbers = (1..=milliohms.len()).map(|n| n as f64).collect();
    let traces = vec![
        Trace::bar(module_numbers, milliohms.clone())
            .on_x_axis(2)
            .on_y_axis(2)
            .hide_legend(),
        Trace::histogram(milliohms.clone()).named("Frequency"),
    ];

    let total: f64 = milliohms.iter().sum();
    let mut axes = BTreeMap::new();
    axes.insert("xaxis1".to_string(), Axis::titled("Module Resistance (mΩ)"));
    let mut module_axis = Axis::titled("Module Number");
    module_axis.anchor = Some("y2".to_string());
    module_axis.title.standoff = Some(0);
    axes.insert("xaxis2".to_string(), module_axis);
    axes.insert(
        "yaxis1".to_string(),
        Axis::titled("# of Modules")
            .with_domain(0.0, 4.0 / 9.0)
            .with_font_size(PACK_STATS_FONT),
    );
    axes.insert(
        "yaxis2".to_string(),
        Axis::titled("Module Resistance (mΩ)")
            .with_domain(5.0 / 9.0, 1.0)
            .with_font_size(PACK_STATS_FONT),
    );

    let annotations = stats
        .three_sigma_bounds()
        .map(|(low, high)| {
            vec![
                sigma_annotation(low, "-3σ"),
                sigma_annotation(high, "+3σ"),
            ]
        })
        .unwrap_or_default();

    let layout = Layout {
        showlegend: true,
        title: Title {
            text: format!(
                "Module Resistance and Distribution - {} mΩ Total",
                integer_part(total)
            ),
        },
        grid: Grid::stacked(2),
        axes,
        annotations,
        shapes: Vec::new(),
        width: dims.width,
        height: dims.height,
    };
    (ChartSpec::new(traces, layout), stats)
}

fn sigma_annotation(x: f64, text: &str) -> Annotation {
    Annotation {
        x,
        y: 0.0,
        text: text.to_string(),
        showarrow: false,
        yshift: -6,
    }
}

/// Pack statistics with the Gaussian overlay, binned by [`AutoBinner`].
pub fn pack_stats(record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    let (base, stats) = pack_stats_base(record, dims);
    let binner = AutoBinner::new(&base);
    statistical_overlay::apply(base.clone(), &binner, &stats)
}

pub fn drivetrain_efficiency(record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    let traces = vec![
        time_series(record, "drivetrain_efficiency").named("Total Drivetrain Efficiency"),
        time_series(record, "motor_efficiency").named("Motor Efficiency"),
        time_series(record, "mc_efficiency").named("Motor Controller Efficiency"),
        time_series(record, "pack_efficiency").named("Battery Pack Efficiency"),
    ];
    let layout = compute_axis_layout(
        "Drivetrain Efficiency and Components",
        &["Efficiency (%)"],
        &AxisLayoutOptions::with_legend(),
        dims,
    );
    ChartSpec::new(traces, layout)
}

pub fn solar(record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    let traces = vec![
        time_series(record, "solar_power").on_y_axis(2),
        time_series(record, "solar_charge"),
    ];
    let layout = compute_axis_layout(
        "Solar Array Power and Charge",
        &["Charge (A-hr)", "Power (W)"],
        &AxisLayoutOptions::default(),
        dims,
    );
    ChartSpec::new(traces, layout)
}

pub fn vtp(record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    let traces = vec![
        time_series(record, "velocity_mph").on_y_axis(3),
        time_series(record, "motor_torque").on_y_axis(2),
        time_series(record, "bus_power"),
    ];
    let layout = compute_axis_layout(
        "VTP Trajectories",
        &["Power (W)", "Torque (N-m)", "Velocity (mph)"],
        &AxisLayoutOptions::default(),
        dims,
    );
    ChartSpec::new(traces, layout)
}

pub fn velocity_phase_throttle(record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    let traces = vec![
        time_series(record, "velocity_mph").on_y_axis(3),
        time_series(record, "phase_current").on_y_axis(2),
        time_series(record, "throttle"),
    ];
    let layout = compute_axis_layout(
        "Velocity, Phase, and Throttle",
        &["Throttle (%)", "Phase Current (Arms)", "Velocity (mph)"],
        &AxisLayoutOptions::default(),
        dims,
    );
    ChartSpec::new(traces, layout)
}

pub fn speed_contour(record: &TelemetryRecord, dims: Dimensions) -> ChartSpec {
    let traces = vec![Trace::gl_markers(
        record.series("x_disp").to_vec(),
        record.series("y_disp").to_vec(),
    )
    .with_marker(MarkerColor::Scale(record.series("velocity_mph").to_vec()))];
    let layout = compute_axis_layout(
        "Race Route Speed Contour",
        &["Distance (mi)"],
        &AxisLayoutOptions::default().x_axis("Distance (mi)"),
        dims,
    );
    ChartSpec::new(traces, layout)
}

/// One raw signal against normalized gallery time.
pub fn raw_signal(signals: &RawSignals, name: &str, dims: Dimensions) -> ChartSpec {
    let traces = vec![Trace::lines(
        signals.timestamps().to_vec(),
        signals.signal(name).to_vec(),
    )];
    let layout = compute_axis_layout(
        &format!("{} versus time", name),
        &[name],
        &AxisLayoutOptions::default(),
        dims,
    );
    ChartSpec::new(traces, layout)
}
