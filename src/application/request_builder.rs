// Time-range request construction for the analysis backend
use chrono::{NaiveDateTime, TimeDelta};
use serde::Deserialize;

use crate::domain::error::{RenderError, Result};

pub const DATE_FORMAT: &str = "%Y/%m/%d %H:%M";
pub const MIN_RESOLUTION_MS: u32 = 100;
pub const MAX_SPAN_HOURS: i64 = 24;

/// Vehicle model parameters forwarded verbatim to the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleParameters {
    #[serde(rename = "Rmot")]
    pub r_mot: f64,
    pub m: f64,
    #[serde(rename = "CDa")]
    pub cda: f64,
    #[serde(rename = "Crr1")]
    pub crr1: f64,
    #[serde(rename = "Crr2")]
    pub crr2: f64,
    #[serde(rename = "Tmax")]
    pub t_max: f64,
    #[serde(rename = "Qmax")]
    pub q_max: f64,
    #[serde(rename = "Rline")]
    pub r_line: f64,
    #[serde(rename = "Vser")]
    pub v_ser: f64,
    #[serde(rename = "VcMax")]
    pub vc_max: f64,
    #[serde(rename = "VcMin")]
    pub vc_min: f64,
}

impl VehicleParameters {
    fn pairs(&self) -> [(&'static str, f64); 11] {
        [
            ("Rmot", self.r_mot),
            ("m", self.m),
            ("CDa", self.cda),
            ("Crr1", self.crr1),
            ("Crr2", self.crr2),
            ("Tmax", self.t_max),
            ("Qmax", self.q_max),
            ("Rline", self.r_line),
            ("Vser", self.v_ser),
            ("VcMax", self.vc_max),
            ("VcMin", self.vc_min),
        ]
    }
}

/// Operator input for the backend's time-range endpoint, as entered in the form.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeRangeRequest {
    /// Wall-clock start, `YYYY/MM/DD HH:mm`
    pub start: String,
    pub end: String,
    pub resolution: u32,
    /// `±HH:MM` offset of the zone the times were entered in
    pub timezone_offset: String,
    #[serde(default)]
    pub terrain: bool,
    #[serde(flatten)]
    pub vehicle: VehicleParameters,
}

impl TimeRangeRequest {
    /// Validate the input and build the URL-encoded form body.
    pub fn form_body(&self) -> Result<String> {
        let (start_ms, end_ms) = self.utc_range()?;
        if self.resolution < MIN_RESOLUTION_MS {
            return Err(RenderError::InvalidRequest(format!(
                "Please enter a resolution time of at least {}ms",
                MIN_RESOLUTION_MS
            )));
        }

        let mut fields = vec![
            ("startDate", start_ms.to_string()),
            ("endDate", end_ms.to_string()),
            ("resolution", self.resolution.to_string()),
        ];
        fields.extend(
            self.vehicle
                .pairs()
                .into_iter()
                .map(|(name, value)| (name, value.to_string())),
        );
        fields.push(("terrain", self.terrain.to_string()));

        Ok(fields
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&"))
    }

    /// Start and end as UTC epoch milliseconds.
    pub fn utc_range(&self) -> Result<(i64, i64)> {
        let range_error = || {
            RenderError::InvalidRequest(format!(
                "Please enter a valid start and end date with a span of no more than {} hours.",
                MAX_SPAN_HOURS
            ))
        };
        let start = NaiveDateTime::parse_from_str(self.start.trim(), DATE_FORMAT)
            .map_err(|_| range_error())?;
        let end = NaiveDateTime::parse_from_str(self.end.trim(), DATE_FORMAT)
            .map_err(|_| range_error())?;
        if start >= end || end - start > TimeDelta::hours(MAX_SPAN_HOURS) {
            return Err(range_error());
        }

        let offset = parse_offset(&self.timezone_offset)?;
        let start_utc = (start - offset).and_utc().timestamp_millis();
        let end_utc = (end - offset).and_utc().timestamp_millis();
        tracing::debug!("Time range {} .. {} (UTC ms)", start_utc, end_utc);
        Ok((start_utc, end_utc))
    }
}

/// Parse `±HH:MM`. The sign applies to the minutes as well.
pub fn parse_offset(offset: &str) -> Result<TimeDelta> {
    let invalid = || RenderError::InvalidRequest(format!("Invalid timezone offset '{}'", offset));
    let trimmed = offset.trim();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i64 = hours.parse().map_err(|_| invalid())?;
    let minutes: i64 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes >= 60 {
        return Err(invalid());
    }
    Ok(TimeDelta::minutes(sign * (hours * 60 + minutes)))
}
