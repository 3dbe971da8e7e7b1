//! Data types for the capture pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::composite::Coordinates;
use crate::config::IconVariant;
use crate::host::HostError;
use crate::storage::StorageError;

/// A click-to-capture request from an observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub coordinates: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_variant: Option<IconVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription_text: Option<String>,
    /// Image pixels per CSS pixel of the capturing display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_pixel_ratio: Option<f64>,
}

impl CaptureRequest {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            coordinates: Coordinates::new(x, y),
            icon_variant: None,
            annotation_text: None,
            transcription_text: None,
            device_pixel_ratio: None,
        }
    }
}

/// The page a request refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<u64>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl PageInfo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            tab_id: None,
            url: url.into(),
            title: None,
        }
    }
}

/// Errors surfaced to the requester of a capture.
///
/// Validation and rate-limit messages are shown to the user as-is; capture
/// and persist errors carry a generic message and keep the host error as
/// their source.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{0}")]
    Validation(String),

    #[error("Please wait a moment before taking another screenshot")]
    RateLimited { retry_after_ms: u64 },

    #[error("Could not capture the page, please try again")]
    Capture(#[source] HostError),

    #[error("Could not save the screenshot, please try again")]
    Persist(#[source] StorageError),

    #[error("Capture task failed: {0}")]
    Task(String),
}

impl CaptureError {
    /// Underlying cause for diagnostics, if any.
    pub fn detail(&self) -> Option<String> {
        match self {
            CaptureError::Capture(source) => Some(source.to_string()),
            CaptureError::Persist(source) => Some(source.to_string()),
            CaptureError::Task(reason) => Some(reason.clone()),
            CaptureError::Validation(_) | CaptureError::RateLimited { .. } => None,
        }
    }
}

/// Stage of the most recent capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Idle,
    Validating,
    RateChecking,
    Capturing,
    Compositing,
    Persisting,
    Done,
    Failed(String),
}

/// What a successful capture produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureReceipt {
    pub download_id: u64,
    pub filename: String,
    pub full_path: String,
    pub size_bytes: u64,
    pub timestamp: DateTime<Utc>,
    /// `false` when the overlay could not be drawn and the raw capture was saved.
    pub composited: bool,
}
