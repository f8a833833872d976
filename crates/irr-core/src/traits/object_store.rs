// # Object Store Trait
//
// Defines the interface for durable object records.
//
// ## Purpose
//
// One record is kept per managed RPSL object. It is created on the first
// submission attempt and replaced on every resubmission, so its status
// always reflects the last classified outcome. Deleting an object in the
// registry does not remove its record: the delete is recorded with
// `action = delete`.
//
// ## Implementations
//
// - File-based: one JSON file per record (`store::FileObjectStore`)
// - In-memory: tests and ephemeral deployments (`store::MemoryObjectStore`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::submission::{Action, ObjectType};

/// Last known state of an object record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectStatus {
    /// Recorded, dispatch not yet classified
    Pending,
    /// Registry accepted the last change
    Submitted,
    /// Last change was rejected or could not be dispatched
    Failed,
}

impl fmt::Display for ObjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectStatus::Pending => "pending",
            ObjectStatus::Submitted => "submitted",
            ObjectStatus::Failed => "failed",
        })
    }
}

/// Durable record of one managed RPSL object
///
/// Passwords are never part of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Stable id, see [`record_id`]
    pub id: String,
    /// RPSL class
    pub object_type: ObjectType,
    /// Natural key (prefix, AS number, set name, ...)
    pub identifier: String,
    /// Last known status
    pub status: ObjectStatus,
    /// Last requested action
    pub action: Action,
    /// RPSL body as submitted
    pub object_text: String,
    /// Time of the last write
    pub last_modified: DateTime<Utc>,
    /// Server alias of the last dispatch
    #[serde(default)]
    pub server: Option<String>,
    /// Whether the last dispatch asked for route expansion
    #[serde(default)]
    pub multiple_routes: bool,
    /// Last classifier message
    #[serde(default)]
    pub message: Option<String>,
    /// File reported by the dispatcher tool, if any
    #[serde(default)]
    pub generated_json_file: Option<String>,
}

impl ObjectRecord {
    /// Create a pending record for an object about to be dispatched
    pub fn pending(
        object_type: ObjectType,
        identifier: impl Into<String>,
        action: Action,
        object_text: impl Into<String>,
    ) -> Self {
        let identifier = identifier.into();
        Self {
            id: record_id(object_type, &identifier),
            object_type,
            identifier,
            status: ObjectStatus::Pending,
            action,
            object_text: object_text.into(),
            last_modified: Utc::now(),
            server: None,
            multiple_routes: false,
            message: None,
            generated_json_file: None,
        }
    }

    /// Move to a new status, refreshing `last_modified`
    pub fn transition(&mut self, status: ObjectStatus) {
        self.status = status;
        self.last_modified = Utc::now();
    }
}

/// Content-based record id: `<type>_<identifier>`
///
/// Characters outside `[A-Za-z0-9_-]` in the identifier become `_`, so
/// `route` + `192.0.2.0/24` gives `route_192_0_2_0_24`.
pub fn record_id(object_type: ObjectType, identifier: &str) -> String {
    let safe: String = identifier
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", object_type.as_str(), safe)
}

/// Resolve a requested id against the stored ones
///
/// An exact match wins; otherwise the first stored id (in iteration order)
/// starting with `wanted`. A blank request matches nothing.
pub fn match_id<'a, I>(stored: I, wanted: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    if wanted.is_empty() {
        return None;
    }

    let ids = stored.into_iter();
    ids.clone()
        .find(|id| *id == wanted)
        .or_else(|| ids.into_iter().find(|id| id.starts_with(wanted)))
}

/// Trait for object record store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently. Writes are whole-record
/// replacements; concurrent writes to the same id are last-writer-wins.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create or replace a record
    async fn put(&self, record: &ObjectRecord) -> Result<()>;

    /// Fetch a record by exact id, then by id prefix
    ///
    /// # Returns
    ///
    /// - `Ok(ObjectRecord)`: The matching record
    /// - `Err(Error::NotFound)`: No stored id matches
    async fn get(&self, id: &str) -> Result<ObjectRecord>;

    /// All readable records, in storage order
    ///
    /// Unreadable entries are logged and skipped. Callers needing recency
    /// must sort by `last_modified`.
    async fn list(&self) -> Result<Vec<ObjectRecord>>;

    /// Remove a record (no-op if it does not exist)
    async fn remove(&self, id: &str) -> Result<()>;

    /// Storage reference of a record, written into audit entries
    fn reference(&self, id: &str) -> String;
}
