// Backend response intake and raw export
use bytes::Bytes;

use super::error::{RenderError, Result};
use super::telemetry::TelemetryRecord;

pub const RAW_DOWNLOAD_FILENAME: &str = "recontool_raw.json";
pub const RAW_DOWNLOAD_MIME: &str = "application/json";

/// The analysis backend's answer to a form submission, kept byte-exact.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: u16,
    pub body: Bytes,
}

impl BackendResponse {
    pub fn new(status: u16, body: Bytes) -> Self {
        Self { status, body }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body.into())
    }

    /// Parse the body as an array of telemetry records.
    pub fn records(&self) -> Result<Vec<TelemetryRecord>> {
        if self.status != 200 {
            return Err(RenderError::BackendRejected {
                status: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            });
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn download(&self) -> RawDownload {
        RawDownload {
            filename: RAW_DOWNLOAD_FILENAME,
            mime: RAW_DOWNLOAD_MIME,
            bytes: self.body.clone(),
        }
    }
}

/// The raw response offered for download, never re-serialized.
#[derive(Debug, Clone)]
pub struct RawDownload {
    pub filename: &'static str,
    pub mime: &'static str,
    pub bytes: Bytes,
}
