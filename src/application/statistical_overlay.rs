//! Gaussian overlay for the module resistance histogram.
//!
//! The overlay needs the tallest realized bin of a histogram that has already been
//! drawn, so the pack statistics chart is built in two phases: the base chart is
//! binned through a [`HistogramStats`] adapter, then rebuilt with the fitted curve
//! and the ±3σ markers. Anything the adapter cannot answer skips the overlay and
//! leaves the base chart intact.

use crate::domain::chart::{Bins, ChartSpec, Shape, Trace, TraceKind, RED};

/// Points on the curve are taken at this many equal increments across its domain.
pub const CURVE_STEPS: usize = 420;
const MARKER_HEADROOM: f64 = 1.1;
const MAX_AUTO_BINS: usize = 100;

/// Realized statistics of one histogram trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinStats {
    pub max_bin_count: f64,
    pub bins: Bins,
}

/// Query a drawn chart's histogram bins.
pub trait HistogramStats {
    fn query(&self, trace_index: usize) -> Option<BinStats>;
}

/// Bins histogram traces of a chart on demand with "nice" 1/2/2.5/5 × 10^k widths.
pub struct AutoBinner<'a> {
    chart: &'a ChartSpec,
}

impl<'a> AutoBinner<'a> {
    pub fn new(chart: &'a ChartSpec) -> Self {
        Self { chart }
    }
}

impl HistogramStats for AutoBinner<'_> {
    fn query(&self, trace_index: usize) -> Option<BinStats> {
        let trace = self.chart.traces.get(trace_index)?;
        if trace.kind != TraceKind::Histogram {
            return None;
        }
        let samples: Vec<f64> = trace.x.iter().copied().filter(|v| v.is_finite()).collect();
        let bins = auto_bins(&samples)?;
        let counts = bin_counts(&samples, bins);
        let max_bin_count = counts.into_iter().max()? as f64;
        Some(BinStats {
            max_bin_count,
            bins,
        })
    }
}

fn nice_bin_size(raw: f64) -> f64 {
    let base = 10f64.powi(raw.log10().floor() as i32);
    let fraction = raw / base;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 2.5 {
        2.5
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * base
}

fn auto_bins(samples: &[f64]) -> Option<Bins> {
    let min = samples.iter().copied().reduce(f64::min)?;
    let max = samples.iter().copied().reduce(f64::max)?;
    let span = max - min;
    let size = if span > 0.0 {
        let target = ((samples.len() as f64).sqrt().ceil() as usize).clamp(1, MAX_AUTO_BINS);
        nice_bin_size(span / target as f64)
    } else {
        1.0
    };
    let start = (min / size).floor() * size;
    let count = ((max - start) / size).floor() as usize + 1;
    Some(Bins {
        start,
        end: start + count as f64 * size,
        size,
    })
}

fn bin_counts(samples: &[f64], bins: Bins) -> Vec<usize> {
    let count = ((bins.end - bins.start) / bins.size).round() as usize;
    let mut counts = vec![0; count.max(1)];
    let last = counts.len() - 1;
    for v in samples {
        let index = ((v - bins.start) / bins.size).floor().max(0.0) as usize;
        counts[index.min(last)] += 1;
    }
    counts
}

/// Mean and standard deviation (milliohms) plus the empirical sample range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackStatistics {
    pub mu: Option<f64>,
    pub sigma: Option<f64>,
    pub r_min: f64,
    pub r_max: f64,
}

impl PackStatistics {
    pub fn new(milliohms: &[f64], mu: Option<f64>, sigma: Option<f64>) -> Self {
        Self {
            mu,
            sigma,
            r_min: milliohms.iter().copied().fold(f64::INFINITY, f64::min),
            r_max: milliohms.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// `(μ − 3σ, μ + 3σ)` when both moments are usable.
    pub fn three_sigma_bounds(&self) -> Option<(f64, f64)> {
        match (self.mu, self.sigma) {
            (Some(mu), Some(sigma)) if mu.is_finite() && sigma.is_finite() && sigma > 0.0 => {
                Some((mu - 3.0 * sigma, mu + 3.0 * sigma))
            }
            _ => None,
        }
    }
}

/// Gaussian shape scaled so its peak equals `hist_max` (not a normalized density).
pub fn gaussian_at(x: f64, hist_max: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    hist_max * (-z * z / 2.0).exp()
}

/// Curve sampled at `steps` equal increments from `start` to `end` inclusive.
pub fn gaussian_curve(
    hist_max: f64,
    mu: f64,
    sigma: f64,
    start: f64,
    end: f64,
    steps: usize,
) -> Option<(Vec<f64>, Vec<f64>)> {
    if !(start.is_finite() && end.is_finite() && end > start) || steps == 0 {
        return None;
    }
    let step = (end - start) / steps as f64;
    let xs: Vec<f64> = (0..=steps).map(|i| start + i as f64 * step).collect();
    let ys = xs.iter().map(|&x| gaussian_at(x, hist_max, mu, sigma)).collect();
    Some((xs, ys))
}

/// Second draw: pin the histogram's bins and add the curve and ±3σ markers.
pub fn apply(mut chart: ChartSpec, stats: &dyn HistogramStats, pack: &PackStatistics) -> ChartSpec {
    let Some(index) = chart
        .traces
        .iter()
        .position(|t| t.kind == TraceKind::Histogram)
    else {
        tracing::warn!("No histogram trace in '{}', skipping overlay", chart.title());
        return chart;
    };
    let Some(bin_stats) = stats.query(index) else {
        tracing::warn!("No bin statistics for '{}', skipping overlay", chart.title());
        return chart;
    };
    chart.traces[index].xbins = Some(bin_stats.bins);

    let (Some((low, high)), Some(mu), Some(sigma)) = (pack.three_sigma_bounds(), pack.mu, pack.sigma)
    else {
        tracing::debug!("Resistance moments unavailable, skipping normal curve");
        return chart;
    };
    let hist_max = bin_stats.max_bin_count;
    if let Some((xs, ys)) = gaussian_curve(
        hist_max,
        mu,
        sigma,
        pack.r_min.min(low),
        pack.r_max.max(high),
        CURVE_STEPS,
    ) {
        chart
            .traces
            .push(Trace::lines(xs, ys).named("Normal Distribution"));
    }
    chart.layout.shapes = vec![
        Shape::vertical_dashed(low, hist_max * MARKER_HEADROOM, RED),
        Shape::vertical_dashed(high, hist_max * MARKER_HEADROOM, RED),
    ];
    chart
}
