//! Versioned export/import of all stored screenshot metadata.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use flate2::{Compression, bufread::GzDecoder, write::GzEncoder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{StorageError, StorageRecord, StorageStats};
use crate::config::Settings;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Top-level fields an import refuses to go without.
pub const REQUIRED_FIELDS: [&str; 2] = ["settings", "screenshots"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub settings: Settings,
    pub screenshots: Vec<StorageRecord>,
    /// Insertion order of `screenshots`; rebuilt from timestamps when absent.
    #[serde(default)]
    pub index: Option<Vec<u64>>,
    #[serde(default)]
    pub stats: Option<StorageStats>,
}

impl StorageSnapshot {
    /// Validates and parses an imported value without applying anything.
    pub fn from_value(value: Value) -> Result<Self, StorageError> {
        let object = value
            .as_object()
            .ok_or_else(|| StorageError::InvalidSnapshot("expected a JSON object".into()))?;

        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| object.get(*field).is_none_or(Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(StorageError::InvalidSnapshot(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        let version = object.get("version").and_then(Value::as_u64).unwrap_or(1);
        if version > u64::from(SNAPSHOT_VERSION) {
            return Err(StorageError::InvalidSnapshot(format!(
                "unsupported version {version} (newest supported is {SNAPSHOT_VERSION})"
            )));
        }

        let mut object = object.clone();
        object.entry("version").or_insert(Value::from(SNAPSHOT_VERSION));
        object
            .entry("exportedAt")
            .or_insert(Value::String(Utc::now().to_rfc3339()));

        serde_json::from_value(Value::Object(object))
            .map_err(|e| StorageError::InvalidSnapshot(e.to_string()))
    }

    /// Record ids in insertion order, dropping ids without a record and
    /// repeats of an id already seen.
    pub fn ordered_ids(&self) -> Vec<u64> {
        let mut seen = HashSet::new();
        match &self.index {
            Some(index) => index
                .iter()
                .copied()
                .filter(|id| self.screenshots.iter().any(|r| r.download_id == *id))
                .filter(|id| seen.insert(*id))
                .collect(),
            None => {
                let mut records: Vec<&StorageRecord> = self.screenshots.iter().collect();
                records.sort_by_key(|r| (r.timestamp, r.download_id));
                records
                    .iter()
                    .map(|r| r.download_id)
                    .filter(|id| seen.insert(*id))
                    .collect()
            }
        }
    }

    /// The first record carrying `download_id`.
    pub fn record(&self, download_id: u64) -> Option<&StorageRecord> {
        self.screenshots.iter().find(|r| r.download_id == download_id)
    }
}

/// Writes `snapshot` to `path`, gzip-compressed when the path ends in `.gz`.
pub fn write_snapshot_file(path: &Path, snapshot: &StorageSnapshot) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(snapshot).context("failed to serialise snapshot")?;
    let compress = path.extension().is_some_and(|ext| ext == "gz");
    if compress {
        bytes = compress_bytes(&bytes)?;
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .with_context(|| format!("failed to open temporary file {}", tmp_path.display()))?;
        tmp_file
            .write_all(&bytes)
            .context("failed to write snapshot")?;
        tmp_file
            .sync_all()
            .context("failed to sync snapshot file")?;
    }
    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "failed to move temporary file {} -> {}",
            tmp_path.display(),
            path.display()
        )
    })?;

    log::info!(
        "Exported {} screenshot record(s) to {} ({} bytes, compression={})",
        snapshot.screenshots.len(),
        path.display(),
        bytes.len(),
        compress
    );
    Ok(())
}

/// Reads a snapshot file as raw JSON; gzip is detected by its magic bytes.
pub fn read_snapshot_file(path: &Path) -> Result<Value> {
    let mut file_bytes = Vec::new();
    File::open(path)
        .with_context(|| format!("failed to open snapshot {}", path.display()))?
        .read_to_end(&mut file_bytes)
        .context("failed to read snapshot")?;

    let json = if is_gzip(&file_bytes) {
        let mut decoder = GzDecoder::new(&file_bytes[..]);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .context("failed to decompress snapshot")?;
        out
    } else {
        file_bytes
    };

    serde_json::from_slice(&json).context("failed to parse snapshot json")
}

fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .context("failed to compress snapshot")?;
    encoder
        .finish()
        .context("failed to finalise compressed snapshot")
}

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() > 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(id: u64, hour: u32) -> StorageRecord {
        StorageRecord {
            download_id: id,
            path: format!("/tmp/{id}.png"),
            filename: format!("{id}.png"),
            url: "https://example.com".into(),
            domain: "example.com".into(),
            timestamp: Utc.with_ymd_and_hms(2023, 8, 20, hour, 0, 0).unwrap(),
            size_bytes: 10,
            annotation_text: None,
            transcription_text: None,
        }
    }

    fn snapshot() -> StorageSnapshot {
        StorageSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap(),
            settings: Settings::from_config(&Config::default()),
            screenshots: vec![record(2, 9), record(1, 8)],
            index: None,
            stats: None,
        }
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let err = StorageSnapshot::from_value(json!({"version": 1, "screenshots": []}))
            .unwrap_err();
        assert!(err.to_string().contains("settings"));

        let err = StorageSnapshot::from_value(json!({"settings": {}})).unwrap_err();
        assert!(err.to_string().contains("screenshots"));

        assert!(StorageSnapshot::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn newer_versions_are_rejected() {
        let mut value = serde_json::to_value(snapshot()).unwrap();
        value["version"] = json!(SNAPSHOT_VERSION + 1);
        assert!(StorageSnapshot::from_value(value).is_err());
    }

    #[test]
    fn ordering_falls_back_to_timestamps() {
        let mut snap = snapshot();
        assert_eq!(snap.ordered_ids(), vec![1, 2]);

        snap.index = Some(vec![2, 9, 1]);
        assert_eq!(snap.ordered_ids(), vec![2, 1]);
    }

    #[test]
    fn gzip_file_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("export.json.gz");
        write_snapshot_file(&path, &snapshot()).unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert!(is_gzip(&raw));

        let value = read_snapshot_file(&path).unwrap();
        assert_eq!(StorageSnapshot::from_value(value).unwrap(), snapshot());
    }

    #[test]
    fn plain_file_is_readable_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("export.json");
        write_snapshot_file(&path, &snapshot()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"exportedAt\""));
    }
}
