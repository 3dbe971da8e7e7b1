//! Storage quota estimation.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::host::HostError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageEstimate {
    pub usage: u64,
    /// Zero when the host reports no quota.
    pub quota: u64,
}

#[async_trait]
pub trait StorageEstimator: Send + Sync {
    async fn estimate(&self) -> Result<StorageEstimate, HostError>;
}

/// Treats the filesystem holding `path` as the quota.
#[derive(Debug, Clone)]
pub struct DiskEstimator {
    path: PathBuf,
}

impl DiskEstimator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StorageEstimator for DiskEstimator {
    async fn estimate(&self) -> Result<StorageEstimate, HostError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            // The download directory may not exist yet; measure its closest ancestor.
            let existing = path
                .ancestors()
                .find(|candidate| candidate.exists())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            let total = fs2::total_space(&existing)?;
            let available = fs2::available_space(&existing)?;
            Ok(StorageEstimate {
                usage: total.saturating_sub(available),
                quota: total,
            })
        })
        .await
        .map_err(|e| HostError::Other(format!("Estimate task failed: {}", e)))?
    }
}
