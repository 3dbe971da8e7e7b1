use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::download::{ConflictAction, DownloadHost, DownloadRequest};
use super::estimate::StorageEstimator;
use super::path::compute_path;
use super::snapshot::{SNAPSHOT_VERSION, StorageSnapshot};
use super::store::{INDEX_KEY, KeyValueStore, STATS_KEY, WriteBatch, record_key};
use super::types::{
    CleanupReport, CompositedArtifact, ImportReport, SaveOptions, SaveOutcome, SpaceReport,
    StorageError, StorageRecord, StorageStats,
};
use crate::capture::filename::extract_domain;
use crate::clock::Clock;
use crate::config::{Config, Settings};
use crate::util::format_bytes;

/// Bounds applied by the manager.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageLimits {
    pub max_index_entries: usize,
    /// `check_storage_space` reports unavailable at or above this usage/quota ratio.
    pub quota_warning_ratio: f64,
}

impl Default for StorageLimits {
    fn default() -> Self {
        Self {
            max_index_entries: 1000,
            quota_warning_ratio: 0.9,
        }
    }
}

impl StorageLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_index_entries: config.storage.max_index_entries,
            quota_warning_ratio: config.storage.quota_warning_ratio,
        }
    }
}

/// Files screenshots through the download host and keeps the metadata index
/// and statistics in the key-value store.
///
/// Every read-modify-write of index/stats runs under one async mutex, so
/// concurrent saves and cleanups on the same manager never lose updates.
/// Writers also hold the store's writer lock ([`KeyValueStore::lock_writer`]),
/// which for [`super::JsonFileStore`] is an exclusive `flock` shared with other
/// processes using the same file.
pub struct StorageManager {
    store: Arc<dyn KeyValueStore>,
    downloads: Arc<dyn DownloadHost>,
    estimator: Arc<dyn StorageEstimator>,
    clock: Arc<dyn Clock>,
    limits: StorageLimits,
    write_lock: Mutex<()>,
}

impl StorageManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        downloads: Arc<dyn DownloadHost>,
        estimator: Arc<dyn StorageEstimator>,
        clock: Arc<dyn Clock>,
        limits: StorageLimits,
    ) -> Self {
        Self {
            store,
            downloads,
            estimator,
            clock,
            limits,
            write_lock: Mutex::new(()),
        }
    }

    pub fn limits(&self) -> StorageLimits {
        self.limits
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Downloads `artifact` and records it.
    ///
    /// Nothing in the store changes when the download fails.
    pub async fn save_screenshot(
        &self,
        artifact: &CompositedArtifact,
        options: &SaveOptions,
    ) -> Result<SaveOutcome, StorageError> {
        let computed = compute_path(artifact, options);
        let size_bytes = artifact.encoded_image.len() as u64;

        log::info!(
            "Saving screenshot as {} ({})",
            computed.full_path,
            format_bytes(size_bytes)
        );

        let download = self
            .downloads
            .download(DownloadRequest {
                relative_path: computed.full_path.clone(),
                bytes: artifact.encoded_image.clone(),
                conflict_action: ConflictAction::Uniquify,
            })
            .await
            .map_err(|err| {
                log::error!("Download of {} failed: {}", computed.full_path, err);
                StorageError::Download(err)
            })?;

        let filename = download
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| computed.filename.clone());

        let record = StorageRecord {
            download_id: download.download_id,
            path: download.path.to_string_lossy().into_owned(),
            filename: filename.clone(),
            url: artifact.source_url.clone(),
            domain: extract_domain(&artifact.source_url),
            timestamp: artifact.timestamp,
            size_bytes,
            annotation_text: artifact.annotation_text.clone(),
            transcription_text: artifact.transcription_text.clone(),
        };

        let _guard = self.write_lock.lock().await;
        let _writer = self.store.lock_writer().await?;
        let mut index = self.load_index().await?;
        let mut stats = self.load_stats().await?;

        let mut batch = WriteBatch::new();
        batch.set(record_key(record.download_id), &record)?;
        index.push(record.download_id);
        stats.record_save(size_bytes, self.clock.now());

        let evicted = self.evict_overflow(&mut index, &mut stats, &mut batch).await?;

        batch.set(INDEX_KEY, &index)?;
        batch.set(STATS_KEY, &stats)?;
        self.store.commit(batch).await?;

        log::debug!(
            "Indexed download {} ({} entries, {} evicted, {} bytes tracked)",
            record.download_id,
            index.len(),
            evicted,
            stats.total_size_bytes
        );

        Ok(SaveOutcome {
            download_id: record.download_id,
            filename,
            full_path: computed.full_path,
            size_bytes,
            evicted,
        })
    }

    /// Drops the oldest entries until the index fits, subtracting exactly the
    /// evicted records' sizes.
    async fn evict_overflow(
        &self,
        index: &mut Vec<u64>,
        stats: &mut StorageStats,
        batch: &mut WriteBatch,
    ) -> Result<usize, StorageError> {
        let max = self.limits.max_index_entries.max(1);
        if index.len() <= max {
            return Ok(0);
        }

        let overflow: Vec<u64> = index.drain(..index.len() - max).collect();
        let mut freed = 0u64;
        for id in &overflow {
            if let Some(record) = self.get_screenshot_metadata(*id).await? {
                freed += record.size_bytes;
            }
            batch.remove(record_key(*id));
        }
        stats.record_removal(overflow.len() as u64, freed);

        log::info!(
            "Evicted {} oldest screenshot record(s), {} bytes",
            overflow.len(),
            freed
        );
        Ok(overflow.len())
    }

    pub async fn get_storage_stats(&self) -> Result<StorageStats, StorageError> {
        self.load_stats().await
    }

    pub async fn get_screenshot_metadata(
        &self,
        download_id: u64,
    ) -> Result<Option<StorageRecord>, StorageError> {
        self.load(&record_key(download_id)).await
    }

    /// All indexed records, oldest first.
    pub async fn get_all_screenshots(&self) -> Result<Vec<StorageRecord>, StorageError> {
        let index = self.load_index().await?;
        let mut records = Vec::with_capacity(index.len());
        for id in index {
            match self.get_screenshot_metadata(id).await? {
                Some(record) => records.push(record),
                None => log::warn!("Index references missing screenshot record {}", id),
            }
        }
        Ok(records)
    }

    /// Removes metadata for screenshots older than `max_age_days`. Files on
    /// disk are left alone.
    pub async fn cleanup_old_data(&self, max_age_days: u32) -> Result<CleanupReport, StorageError> {
        let cutoff = self.clock.now() - chrono::Duration::days(i64::from(max_age_days));

        let _guard = self.write_lock.lock().await;
        let _writer = self.store.lock_writer().await?;
        let index = self.load_index().await?;
        let mut stats = self.load_stats().await?;
        let mut batch = WriteBatch::new();
        let mut kept = Vec::with_capacity(index.len());
        let mut report = CleanupReport::default();

        for id in index {
            match self.get_screenshot_metadata(id).await? {
                Some(record) if record.timestamp < cutoff => {
                    report.removed += 1;
                    report.size_freed += record.size_bytes;
                    batch.remove(record_key(id));
                }
                Some(_) => kept.push(id),
                None => log::debug!("Dropping dangling index entry {}", id),
            }
        }

        stats.record_removal(report.removed as u64, report.size_freed);
        batch.set(INDEX_KEY, &kept)?;
        batch.set(STATS_KEY, &stats)?;
        self.store.commit(batch).await?;

        log::info!(
            "Cleanup older than {} day(s): removed {}, freed {}",
            max_age_days,
            report.removed,
            format_bytes(report.size_freed)
        );
        Ok(report)
    }

    pub async fn check_storage_space(&self) -> Result<SpaceReport, StorageError> {
        let estimate = self
            .estimator
            .estimate()
            .await
            .map_err(StorageError::Estimate)?;

        let available = estimate.quota == 0
            || (estimate.usage as f64 / estimate.quota as f64) < self.limits.quota_warning_ratio;
        if !available {
            log::warn!(
                "Storage usage {} of {} crossed the {:.0}% warning mark",
                format_bytes(estimate.usage),
                format_bytes(estimate.quota),
                self.limits.quota_warning_ratio * 100.0
            );
        }

        Ok(SpaceReport {
            available,
            usage: estimate.usage,
            quota: estimate.quota,
        })
    }

    pub async fn export_screenshot_data(
        &self,
        settings: &Settings,
    ) -> Result<StorageSnapshot, StorageError> {
        let _guard = self.write_lock.lock().await;
        let index = self.load_index().await?;
        let mut screenshots = Vec::with_capacity(index.len());
        for id in &index {
            if let Some(record) = self.get_screenshot_metadata(*id).await? {
                screenshots.push(record);
            }
        }

        Ok(StorageSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: self.clock.now(),
            settings: settings.clone(),
            screenshots,
            index: Some(index),
            stats: Some(self.load_stats().await?),
        })
    }

    /// Replaces all stored metadata and settings with `value`.
    ///
    /// The snapshot is fully validated first; a rejected import changes nothing.
    /// Totals are recomputed from the imported records.
    pub async fn import_screenshot_data(
        &self,
        value: serde_json::Value,
    ) -> Result<ImportReport, StorageError> {
        let snapshot = StorageSnapshot::from_value(value)?;
        let mut settings = snapshot.settings.clone();
        settings.clamp();

        let mut ids = snapshot.ordered_ids();
        let max = self.limits.max_index_entries.max(1);
        if ids.len() > max {
            ids.drain(..ids.len() - max);
        }

        let _guard = self.write_lock.lock().await;
        let _writer = self.store.lock_writer().await?;
        let mut batch = WriteBatch::new();
        for id in self.load_index().await? {
            batch.remove(record_key(id));
        }

        let mut stats = snapshot.stats.clone().unwrap_or_default();
        stats.total_screenshots = 0;
        stats.total_size_bytes = 0;
        for id in &ids {
            if let Some(record) = snapshot.record(*id) {
                stats.total_screenshots += 1;
                stats.total_size_bytes += record.size_bytes;
                batch.set(record_key(*id), record)?;
            }
        }

        batch.set(INDEX_KEY, &ids)?;
        batch.set(STATS_KEY, &stats)?;
        batch.set(Settings::STORE_KEY, &settings)?;
        self.store.commit(batch).await?;

        log::info!("Imported {} screenshot record(s)", ids.len());
        Ok(ImportReport {
            screenshots: ids.len(),
            settings,
        })
    }

    async fn load_index(&self) -> Result<Vec<u64>, StorageError> {
        Ok(self.load(INDEX_KEY).await?.unwrap_or_default())
    }

    async fn load_stats(&self) -> Result<StorageStats, StorageError> {
        Ok(self.load(STATS_KEY).await?.unwrap_or_default())
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.store.get(key).await? {
            Some(value) => Ok(Some(
                serde_json::from_value(value).map_err(super::store::StoreError::from)?,
            )),
            None => Ok(None),
        }
    }
}
