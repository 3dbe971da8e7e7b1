//! File downloads with collision avoidance.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::host::HostError;

/// What to do when the destination file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    /// Append ` (n)` before the extension until the name is free.
    #[default]
    Uniquify,
    Overwrite,
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// `/`-separated path relative to the download root.
    pub relative_path: String,
    pub bytes: Vec<u8>,
    pub conflict_action: ConflictAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub download_id: u64,
    /// Absolute path actually written.
    pub path: PathBuf,
}

/// Host download capability.
#[async_trait]
pub trait DownloadHost: Send + Sync {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadResult, HostError>;
}

/// Writes downloads below a root directory.
///
/// Ids start from the current Unix time in milliseconds so they stay unique
/// across restarts of the controller.
#[derive(Debug)]
pub struct FileDownloader {
    root: PathBuf,
    next_id: AtomicU64,
}

impl FileDownloader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let seed = chrono::Utc::now().timestamp_millis().max(1) as u64;
        Self {
            root: root.into(),
            next_id: AtomicU64::new(seed),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DownloadHost for FileDownloader {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadResult, HostError> {
        let relative = checked_relative_path(&request.relative_path)?;
        let target = self.root.join(relative);
        let download_id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let path = tokio::task::spawn_blocking(move || {
            write_download(&target, &request.bytes, request.conflict_action)
        })
        .await
        .map_err(|e| HostError::Other(format!("Download task failed: {}", e)))??;

        log::info!("Download {} written to {}", download_id, path.display());
        Ok(DownloadResult { download_id, path })
    }
}

fn checked_relative_path(relative: &str) -> Result<PathBuf, HostError> {
    let path = PathBuf::from(relative);
    let escapes = path
        .components()
        .any(|component| !matches!(component, Component::Normal(_)));
    if relative.trim().is_empty() || escapes {
        return Err(HostError::InvalidResponse(format!(
            "Refusing download outside the download directory: '{}'",
            relative
        )));
    }
    Ok(path)
}

fn write_download(
    target: &Path,
    bytes: &[u8],
    conflict_action: ConflictAction,
) -> Result<PathBuf, HostError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut attempt = 0u32;
    loop {
        let candidate = match conflict_action {
            ConflictAction::Overwrite => target.to_path_buf(),
            ConflictAction::Uniquify => uniquified(target, attempt),
        };

        let mut options = OpenOptions::new();
        options.write(true);
        match conflict_action {
            ConflictAction::Overwrite => options.create(true).truncate(true),
            ConflictAction::Uniquify => options.create_new(true),
        };

        match options.open(&candidate) {
            Ok(mut file) => {
                file.write_all(bytes)?;
                file.sync_all()?;
                restrict_permissions(&candidate)?;
                return Ok(candidate);
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                attempt += 1;
                log::debug!("{} exists, trying another name", candidate.display());
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// `shot.png` -> `shot (n).png` for `n > 0`.
pub fn uniquified(path: &Path, attempt: u32) -> PathBuf {
    if attempt == 0 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, attempt, ext.to_string_lossy()),
        None => format!("{} ({})", stem, attempt),
    };
    path.with_file_name(name)
}

fn restrict_permissions(path: &Path) -> Result<(), HostError> {
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
