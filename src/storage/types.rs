//! Data types for persisted screenshots and usage statistics.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use super::store::StoreError;
use crate::composite::{Coordinates, encode::sniff_format};
use crate::config::{ImageFormat, Settings};
use crate::host::HostError;

/// Encoded capture plus the metadata needed to file it.
///
/// When `format` is missing on the wire it is taken from the data URL's MIME
/// type, then from the image bytes themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ArtifactWire")]
pub struct CompositedArtifact {
    /// Encoded image bytes; a `data:` URL on the wire.
    #[serde(serialize_with = "data_url::serialize")]
    pub encoded_image: Vec<u8>,
    pub format: ImageFormat,
    pub source_url: String,
    pub timestamp: DateTime<Utc>,
    pub coordinates: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription_text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactWire {
    encoded_image: String,
    #[serde(default)]
    format: Option<ImageFormat>,
    source_url: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    coordinates: Coordinates,
    #[serde(default)]
    annotation_text: Option<String>,
    #[serde(default)]
    transcription_text: Option<String>,
}

impl TryFrom<ArtifactWire> for CompositedArtifact {
    type Error = String;

    fn try_from(wire: ArtifactWire) -> Result<Self, Self::Error> {
        let (encoded_image, mime_format) = data_url::decode(&wire.encoded_image)?;
        let format = wire
            .format
            .or(mime_format)
            .or_else(|| sniff_format(&encoded_image))
            .unwrap_or_default();

        Ok(Self {
            encoded_image,
            format,
            source_url: wire.source_url,
            timestamp: wire.timestamp,
            coordinates: wire.coordinates,
            annotation_text: wire.annotation_text,
            transcription_text: wire.transcription_text,
        })
    }
}

/// Metadata kept for every saved screenshot, keyed by download id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRecord {
    pub download_id: u64,
    /// Absolute path of the written file.
    pub path: String,
    pub filename: String,
    pub url: String,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription_text: Option<String>,
}

/// Rolling usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageStats {
    pub total_screenshots: u64,
    pub total_size_bytes: u64,
    pub monthly_count: u64,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl StorageStats {
    /// Accounts for one saved screenshot of `size_bytes` at `now`.
    ///
    /// `monthly_count` restarts at 1 when the previous save happened in a
    /// different calendar month.
    pub fn record_save(&mut self, size_bytes: u64, now: DateTime<Utc>) {
        let same_month = self
            .last_saved_at
            .is_some_and(|last| last.year() == now.year() && last.month() == now.month());

        self.monthly_count = if same_month {
            self.monthly_count + 1
        } else {
            1
        };
        self.total_screenshots += 1;
        self.total_size_bytes += size_bytes;
        self.last_saved_at = Some(now);
    }

    /// Removes `count` screenshots totalling `size_bytes`.
    pub fn record_removal(&mut self, count: u64, size_bytes: u64) {
        self.total_screenshots = self.total_screenshots.saturating_sub(count);
        self.total_size_bytes = self.total_size_bytes.saturating_sub(size_bytes);
    }
}

/// Where and how a screenshot is filed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveOptions {
    pub root_folder: String,
    pub organize_by_month: bool,
    /// Replaces the computed folder, relative to the download directory.
    pub custom_path: Option<String>,
    /// Replaces the generated filename.
    pub filename: Option<String>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            root_folder: "UX-Screenshots".to_string(),
            organize_by_month: true,
            custom_path: None,
            filename: None,
        }
    }
}

impl SaveOptions {
    pub fn from_settings(settings: &Settings, root_folder: &str) -> Self {
        Self {
            root_folder: root_folder.to_string(),
            organize_by_month: settings.organize_by_month,
            custom_path: settings.custom_path.clone(),
            filename: None,
        }
    }
}

/// Destination of a screenshot relative to the download directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedPath {
    /// `/`-separated relative path including the filename.
    pub full_path: String,
    pub filename: String,
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub download_id: u64,
    /// Final filename after collision avoidance.
    pub filename: String,
    pub full_path: String,
    pub size_bytes: u64,
    /// Records evicted to keep the index bounded.
    pub evicted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub removed: usize,
    pub size_freed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceReport {
    /// `false` once usage crosses the warning ratio of the quota.
    pub available: bool,
    pub usage: u64,
    pub quota: u64,
}

/// Outcome of importing a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub screenshots: usize,
    pub settings: Settings,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Download failed: {0}")]
    Download(#[source] HostError),

    #[error("Storage estimate unavailable: {0}")]
    Estimate(#[source] HostError),

    #[error("Metadata store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Screenshot {0} not found")]
    NotFound(u64),
}

/// `data:<mime>;base64,<payload>` encoding for image bytes. Bare base64 is
/// accepted on input.
mod data_url {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let mime = sniff_format(bytes).unwrap_or_default().mime_type();
        serializer.serialize_str(&format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
    }

    /// Bytes plus the format named by the MIME type, if it is one we write.
    pub fn decode(text: &str) -> Result<(Vec<u8>, Option<ImageFormat>), String> {
        let (format, payload) = match text.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest
                    .split_once(',')
                    .ok_or_else(|| "data URL without payload".to_string())?;
                let mime = header.split(';').next().unwrap_or_default();
                (format_for_mime(mime), data)
            }
            None => (None, text),
        };
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| format!("invalid base64 image: {e}"))?;
        Ok((bytes, format))
    }

    fn format_for_mime(mime: &str) -> Option<ImageFormat> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }
}
