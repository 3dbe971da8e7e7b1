//! Persistent key-value store holding screenshot metadata, statistics and
//! settings.
//!
//! Keys: [`INDEX_KEY`], [`STATS_KEY`], `screenshot_{id}` per record (see
//! [`record_key`]), and the settings key.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use fs2::FileExt;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const INDEX_KEY: &str = "screenshotIndex";
pub const STATS_KEY: &str = "storageStats";

pub fn record_key(download_id: u64) -> String {
    format!("screenshot_{download_id}")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store contents are not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store task failed: {0}")]
    Task(String),
}

/// Set of writes applied together by [`KeyValueStore::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    set: Vec<(String, Value)>,
    remove: Vec<String>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) -> Result<(), StoreError> {
        self.set.push((key.into(), serde_json::to_value(value)?));
        Ok(())
    }

    pub fn remove(&mut self, key: impl Into<String>) {
        self.remove.push(key.into());
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    /// Removals first, then sets.
    fn apply(self, entries: &mut BTreeMap<String, Value>) {
        for key in self.remove {
            entries.remove(&key);
        }
        for (key, value) in self.set {
            entries.insert(key, value);
        }
    }
}

/// Host key-value persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Applies every write in `batch` or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Serialized size of the stored data.
    async fn bytes_in_use(&self) -> Result<u64, StoreError>;

    /// Keeps other writers out, other processes included, until the guard
    /// is dropped. Stores owned by one process need no more than a no-op.
    async fn lock_writer(&self) -> Result<WriterLock, StoreError> {
        Ok(WriterLock::default())
    }
}

/// Held for the length of a read-modify-write sequence.
#[derive(Debug, Default)]
pub struct WriterLock {
    file: Option<File>,
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take()
            && let Err(err) = file.unlock()
        {
            log::warn!("failed to release store writer lock: {}", err);
        }
    }
}

/// In-process store, used for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Value>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        batch.apply(&mut self.lock());
        Ok(())
    }

    async fn bytes_in_use(&self) -> Result<u64, StoreError> {
        Ok(serde_json::to_vec(&*self.lock())?.len() as u64)
    }
}

/// Store kept in a single JSON object on disk.
///
/// Reads take a shared `fs2` lock on a sibling `.lock` file and commits an
/// exclusive one; commits write a temporary file and rename it over the store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || op(&path))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let key = key.to_string();
        self.blocking(move |path| {
            let entries = with_lock(path, false, read_entries)?;
            Ok(entries.get(&key).cloned())
        })
        .await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.blocking(move |path| {
            with_lock(path, true, |path| {
                let mut entries = read_entries(path)?;
                batch.apply(&mut entries);
                write_entries(path, &entries)
            })
        })
        .await
    }

    async fn lock_writer(&self) -> Result<WriterLock, StoreError> {
        self.blocking(|path| {
            let file = open_lock_file(&writer_lock_path(path))?;
            file.lock_exclusive()?;
            Ok(WriterLock { file: Some(file) })
        })
        .await
    }

    async fn bytes_in_use(&self) -> Result<u64, StoreError> {
        self.blocking(|path| match fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err.into()),
        })
        .await
    }
}

fn with_lock<T>(
    path: &Path,
    exclusive: bool,
    op: impl FnOnce(&Path) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let lock_path = path.with_extension("lock");
    let lock_file = open_lock_file(&lock_path)?;
    if exclusive {
        lock_file.lock_exclusive()?;
    } else {
        lock_file.lock_shared()?;
    }

    let result = op(path);

    lock_file.unlock().unwrap_or_else(|err| {
        log::warn!("failed to unlock store {}: {}", lock_path.display(), err)
    });

    result
}

/// Separate from the per-call `.lock` so a held writer lock never blocks
/// its own gets and commits.
fn writer_lock_path(path: &Path) -> PathBuf {
    path.with_extension("writer.lock")
}

fn open_lock_file(lock_path: &Path) -> Result<File, StoreError> {
    if let Some(parent) = lock_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)?)
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, Value>, StoreError> {
    let mut bytes = Vec::new();
    match File::open(path) {
        Ok(mut file) => {
            file.read_to_end(&mut bytes)?;
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => return Err(err.into()),
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_entries(path: &Path, entries: &BTreeMap<String, Value>) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(entries)?;
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp_file.write_all(&bytes)?;
        tmp_file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    log::debug!("Store written to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn memory_store_applies_batches() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("a", &1).unwrap();
        batch.set("b", &json!({"x": true})).unwrap();
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.remove("a");
        store.commit(batch).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), Some(json!({"x": true})));
        assert!(store.bytes_in_use().await.unwrap() > 0);
    }

    #[tokio::test]
    async fn file_store_persists_between_instances() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store.json");

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get(INDEX_KEY).await.unwrap(), None);
        assert_eq!(store.bytes_in_use().await.unwrap(), 0);

        let mut batch = WriteBatch::new();
        batch.set(INDEX_KEY, &vec![1u64, 2, 3]).unwrap();
        batch.set(record_key(1), &json!({"filename": "a.png"})).unwrap();
        store.commit(batch).await.unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get(INDEX_KEY).await.unwrap(),
            Some(json!([1, 2, 3]))
        );
        assert_eq!(
            reopened.get("screenshot_1").await.unwrap(),
            Some(json!({"filename": "a.png"}))
        );
        assert!(reopened.bytes_in_use().await.unwrap() > 0);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get("x").await, Err(StoreError::Serde(_))));
    }

    #[tokio::test]
    async fn writer_lock_excludes_other_instances() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        let lock_path = writer_lock_path(&path);

        let guard = JsonFileStore::new(&path).lock_writer().await.unwrap();

        // Gets and commits still go through while the writer lock is held.
        let other = JsonFileStore::new(&path);
        let mut batch = WriteBatch::new();
        batch.set(STATS_KEY, &json!({"totalScreenshots": 1})).unwrap();
        other.commit(batch).await.unwrap();

        let contender = open_lock_file(&lock_path).unwrap();
        assert!(contender.try_lock_exclusive().is_err());

        drop(guard);
        assert!(contender.try_lock_exclusive().is_ok());
        contender.unlock().unwrap();
    }

    #[tokio::test]
    async fn memory_store_writer_lock_is_free() {
        let store = MemoryStore::new();
        let _first = store.lock_writer().await.unwrap();
        let _second = store.lock_writer().await.unwrap();
    }
}
