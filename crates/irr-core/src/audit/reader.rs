use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReadDirStream;

use super::entry::{AuditEntry, parse_audit_log};
use crate::error::{Error, Result};

const LOG_PREFIX: &str = "audit_";
const LOG_SUFFIX: &str = ".log";

/// Read-only view over the `audit_*.log` files of one directory
#[derive(Debug, Clone)]
pub struct AuditLogReader {
    dir: PathBuf,
}

impl AuditLogReader {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All entries, optionally filtered, in file-name then file order
    ///
    /// Entries are numbered from 1 before filtering, so an id identifies the
    /// same entry regardless of the filter. A missing directory yields no
    /// entries; unreadable files are logged and skipped.
    pub async fn query(&self, filter: Option<&str>) -> Result<Vec<AuditEntry>> {
        let files = self.log_files().await?;

        let mut entries = Vec::new();
        for path in files {
            match fs::read_to_string(&path).await {
                Ok(content) => entries.extend(parse_audit_log(&content)),
                Err(e) => tracing::warn!("Skipping audit log {}: {}", path.display(), e),
            }
        }

        for (index, entry) in entries.iter_mut().enumerate() {
            entry.id = index + 1;
        }

        if let Some(needle) = filter {
            entries.retain(|entry| entry.matches(needle));
        }

        tracing::debug!("Audit query returned {} entries", entries.len());
        Ok(entries)
    }

    async fn log_files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let read_dir = fs::read_dir(&self.dir).await.map_err(|e| {
            Error::audit(format!(
                "Failed to read audit directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut stream = ReadDirStream::new(read_dir);
        let mut files = Vec::new();
        while let Some(entry) = stream.next().await {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            let is_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(LOG_PREFIX) && n.ends_with(LOG_SUFFIX));
            if is_log {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}
