//! Persistence of composited screenshots.
//!
//! This module turns a [`CompositedArtifact`] into a file under the download
//! directory plus a [`StorageRecord`], and maintains:
//! - a bounded, insertion-ordered index of record ids (FIFO eviction)
//! - rolling usage statistics with a monthly counter
//! - cleanup by age, quota checks, and versioned export/import

pub mod download;
pub mod estimate;
pub mod path;
pub mod snapshot;
pub mod store;
pub mod types;

mod manager;

pub use download::{ConflictAction, DownloadHost, DownloadRequest, DownloadResult, FileDownloader};
pub use estimate::{DiskEstimator, StorageEstimate, StorageEstimator};
pub use manager::{StorageLimits, StorageManager};
pub use path::compute_path;
pub use snapshot::{StorageSnapshot, read_snapshot_file, write_snapshot_file};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError, WriteBatch, WriterLock};
pub use types::{
    CleanupReport, CompositedArtifact, ComputedPath, ImportReport, SaveOptions, SaveOutcome,
    SpaceReport, StorageError, StorageRecord, StorageStats,
};
