// Telemetry record domain models
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

const MS_PER_MINUTE: f64 = 60_000.0;

/// One field of a telemetry record as delivered by the analysis backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(f64),
    Series(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
    Signals(BTreeMap<String, Vec<f64>>),
    // null, strings, booleans and anything else we have no use for
    Other(serde_json::Value),
}

/// One run or lap of a vehicle test. Read-only input to the renderer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryRecord {
    #[serde(flatten)]
    fields: HashMap<String, FieldValue>,
}

impl TelemetryRecord {
    pub fn new(fields: HashMap<String, FieldValue>) -> Self {
        Self { fields }
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        match self.fields.get(name) {
            Some(FieldValue::Scalar(value)) => Some(*value),
            _ => None,
        }
    }

    /// Numeric series for `name`, empty when the field is absent or not a series.
    pub fn series(&self, name: &str) -> &[f64] {
        match self.fields.get(name) {
            Some(FieldValue::Series(values)) => values,
            _ => &[],
        }
    }

    pub fn matrix(&self, name: &str) -> &[Vec<f64>] {
        match self.fields.get(name) {
            Some(FieldValue::Matrix(rows)) => rows,
            // an empty array deserializes as a series
            _ => &[],
        }
    }

    pub fn time_min(&self) -> &[f64] {
        self.series("time_min")
    }

    /// Raw signals, present only when both `raw_timestamps` and `raw_values` are.
    pub fn raw_signals(&self) -> Option<RawSignals> {
        let timestamps = match self.fields.get("raw_timestamps")? {
            FieldValue::Series(values) => values.clone(),
            _ => return None,
        };
        let values = match self.fields.get("raw_values")? {
            FieldValue::Signals(signals) => signals.clone(),
            _ => return None,
        };
        Some(RawSignals::new(timestamps, values))
    }

    pub fn has_raw_signals(&self) -> bool {
        matches!(self.fields.get("raw_timestamps"), Some(FieldValue::Series(_)))
            && matches!(self.fields.get("raw_values"), Some(FieldValue::Signals(_)))
    }
}

/// Unaligned raw signals shown in the collapsible gallery.
#[derive(Debug, Clone)]
pub struct RawSignals {
    timestamps: Vec<f64>,
    values: BTreeMap<String, Vec<f64>>,
    normalized: bool,
}

impl RawSignals {
    pub fn new(timestamps: Vec<f64>, values: BTreeMap<String, Vec<f64>>) -> Self {
        Self {
            timestamps,
            values,
            normalized: false,
        }
    }

    /// Convert millisecond timestamps to minutes elapsed since the first one.
    /// Runs once; later calls are no-ops.
    pub fn normalize_in_place(&mut self) {
        if self.normalized {
            return;
        }
        if let Some(&start) = self.timestamps.first() {
            for t in self.timestamps.iter_mut() {
                *t = (*t - start) / MS_PER_MINUTE;
            }
        }
        self.normalized = true;
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn signal(&self, name: &str) -> &[f64] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}
