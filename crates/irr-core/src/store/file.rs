// # File Object Store
//
// File-based implementation of ObjectStore.
//
// ## Layout
//
// One pretty-printed JSON file per record, named after the record id:
//
// ```text
// objects/
//   route_192_0_2_0_24.json
//   aut-num_AS65000.json
// ```
//
// ## Durability
//
// - Atomic writes: each put writes a uniquely named temp file, then renames
//   it over the target, so readers never observe a half-written record and
//   concurrent writers resolve to last-writer-wins.
// - Corrupted or foreign files are logged and skipped by `list`, never
//   aborting the listing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReadDirStream;

use crate::error::{Error, Result};
use crate::traits::object_store::{ObjectRecord, ObjectStore, match_id};

const RECORD_EXTENSION: &str = "json";

/// Distinguishes temp files of concurrent writers within this process
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// File-based object store
///
/// # Example
///
/// ```rust,no_run
/// use irr_core::store::FileObjectStore;
/// use irr_core::traits::ObjectStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileObjectStore::new("/var/lib/irr/objects").await?;
///
///     for record in store.list().await? {
///         println!("{} {}", record.id, record.status);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileObjectStore {
    dir: PathBuf,
}

impl FileObjectStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.exists() {
            fs::create_dir_all(&dir).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create objects directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(Self { dir })
    }

    /// Directory holding the record files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `id`
    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    /// Ids must stay inside the store directory
    fn is_safe_id(id: &str) -> bool {
        !id.is_empty() && !id.contains('/') && !id.contains('\\') && !id.contains("..")
    }

    /// Unique temp path next to the target, for write-then-rename
    fn temp_path(&self, id: &str) -> PathBuf {
        let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!("{}.{}.{}.{}.tmp", id, RECORD_EXTENSION, std::process::id(), seq))
    }

    /// Stems of all `*.json` files, sorted
    async fn stored_ids(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).await.map_err(|e| {
            Error::store(format!(
                "Failed to read objects directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut stream = ReadDirStream::new(entries);
        let mut ids = Vec::new();
        while let Some(entry) = stream.next().await {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            if let Some(id) = Self::id_from_path(&entry.path()) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn id_from_path(path: &Path) -> Option<String> {
        if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
            return None;
        }
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
    }

    async fn read_record(&self, id: &str) -> Result<ObjectRecord> {
        let path = self.record_path(id);
        let content = fs::read_to_string(&path).await.map_err(|e| {
            Error::store(format!("Failed to read record {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::store(format!("Failed to parse record {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl ObjectStore for FileObjectStore {
    async fn put(&self, record: &ObjectRecord) -> Result<()> {
        if !Self::is_safe_id(&record.id) {
            return Err(Error::store(format!("Invalid record id: {:?}", record.id)));
        }

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| Error::store(format!("Failed to serialize record: {}", e)))?;

        let temp_path = self.temp_path(&record.id);
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        let path = self.record_path(&record.id);
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )));
        }

        tracing::trace!("Record written: {}", path.display());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<ObjectRecord> {
        if !Self::is_safe_id(id) {
            return Err(Error::not_found(format!("Object not found: {}", id)));
        }

        if self.record_path(id).exists() {
            return self.read_record(id).await;
        }

        let mut ids = self.stored_ids().await?;
        ids.sort();

        let matched = match_id(ids.iter().map(String::as_str), id)
            .ok_or_else(|| Error::not_found(format!("Object not found: {}", id)))?;

        self.read_record(matched).await
    }

    async fn list(&self) -> Result<Vec<ObjectRecord>> {
        let ids = self.stored_ids().await?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.read_record(&id).await {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping record {}: {}", id, e),
            }
        }

        tracing::debug!("Listed {} object records", records.len());
        Ok(records)
    }

    async fn remove(&self, id: &str) -> Result<()> {
        if !Self::is_safe_id(id) {
            return Ok(());
        }

        match fs::remove_file(self.record_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::store(format!("Failed to remove record {}: {}", id, e))),
        }
    }

    fn reference(&self, id: &str) -> String {
        self.record_path(id).display().to_string()
    }
}
