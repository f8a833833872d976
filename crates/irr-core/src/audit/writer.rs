use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::entry::{
    AUDIT_DELIMITER, KEY_HOST_IP, KEY_JSON_FILE, KEY_OPERATION, KEY_TIMESTAMP, KEY_USERNAME,
};
use crate::error::{Error, Result};

/// Timestamp format written into entries
pub const AUDIT_TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H:%M";

/// Fields of one entry to append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub username: String,
    pub host_ip: String,
    pub operation: String,
    pub json_file: String,
}

/// Appends entries to one `audit_<MM-DD-YYYY>.log` file per day
///
/// Appends within this process are serialized so entries never interleave.
#[derive(Debug)]
pub struct AuditLogWriter {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl AuditLogWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Append `record` stamped with the current local time
    pub async fn append(&self, record: &AuditRecord) -> Result<PathBuf> {
        self.append_at(record, Local::now()).await
    }

    /// Append `record` stamped with `at`; the file is chosen by `at`'s date
    pub async fn append_at(&self, record: &AuditRecord, at: DateTime<Local>) -> Result<PathBuf> {
        let path = self.dir.join(format!("audit_{}.log", at.format("%m-%d-%Y")));
        let block = format_entry(record, &at.format(AUDIT_TIMESTAMP_FORMAT).to_string());

        let _guard = self.lock.lock().await;

        fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::audit(format!(
                "Failed to create audit directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| Error::audit(format!("Failed to open {}: {}", path.display(), e)))?;

        file.write_all(block.as_bytes())
            .await
            .map_err(|e| Error::audit(format!("Failed to append to {}: {}", path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| Error::audit(format!("Failed to flush {}: {}", path.display(), e)))?;

        tracing::trace!("Audit entry appended to {}", path.display());
        Ok(path)
    }
}

fn format_entry(record: &AuditRecord, timestamp: &str) -> String {
    format!(
        "{}: {}\n{}: {}\n{}: {}\n{}: {}\n{}: {}\n{}\n",
        KEY_TIMESTAMP,
        timestamp,
        KEY_USERNAME,
        single_line(&record.username),
        KEY_HOST_IP,
        single_line(&record.host_ip),
        KEY_OPERATION,
        single_line(&record.operation),
        KEY_JSON_FILE,
        single_line(&record.json_file),
        AUDIT_DELIMITER,
    )
}

/// Keep caller-supplied values from forging extra lines
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::parse_audit_log;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn record(operation: &str) -> AuditRecord {
        AuditRecord {
            username: "alice".into(),
            host_ip: "192.0.2.10".into(),
            operation: operation.into(),
            json_file: "objects/route_192_0_2_0_24.json".into(),
        }
    }

    #[tokio::test]
    async fn test_appends_to_daily_file() {
        let dir = tempdir().unwrap();
        let writer = AuditLogWriter::new(dir.path());
        let at = Local.with_ymd_and_hms(2026, 10, 19, 14, 2, 0).unwrap();

        let path = writer.append_at(&record("add"), at).await.unwrap();
        writer.append_at(&record("modify"), at).await.unwrap();
        assert!(path.ends_with("audit_10-19-2026.log"));

        let content = std::fs::read_to_string(&path).unwrap();
        let entries = parse_audit_log(&content);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].timestamp, "10-19-2026 14:02");
        assert_eq!(entries[0].operation, "add");
        assert_eq!(entries[1].operation, "modify");
        assert_eq!(entries[1].object_type, "route");
    }

    #[tokio::test]
    async fn test_newlines_in_values_are_flattened() {
        let dir = tempdir().unwrap();
        let writer = AuditLogWriter::new(dir.path());
        let mut rec = record("add");
        rec.username = "mallory\nTimestamp: forged".into();

        let path = writer.append(&rec).await.unwrap();
        let entries = parse_audit_log(&std::fs::read_to_string(path).unwrap());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].username, "mallory Timestamp: forged");
    }
}
