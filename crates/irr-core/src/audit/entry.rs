//! Audit entry parsing
//!
//! An audit log is a sequence of blocks separated by [`AUDIT_DELIMITER`]
//! lines. Each block is a set of `Key: value` lines:
//!
//! ```text
//! Timestamp: 10-19-2026 14:02
//! Username: alice
//! Host IP: 192.0.2.10
//! Operation: add
//! JSON File: objects/route_192_0_2_0_24.json
//! ----------------------------------------
//! ```
//!
//! Keys are case-insensitive and split from the value at the first `": "`.
//! Blocks without a timestamp are dropped.

use serde::{Deserialize, Serialize};

/// Line separating two audit entries
pub const AUDIT_DELIMITER: &str = "----------------------------------------";

pub(crate) const KEY_TIMESTAMP: &str = "Timestamp";
pub(crate) const KEY_USERNAME: &str = "Username";
pub(crate) const KEY_HOST_IP: &str = "Host IP";
pub(crate) const KEY_OPERATION: &str = "Operation";
pub(crate) const KEY_JSON_FILE: &str = "JSON File";

/// One parsed audit entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// 1-based position across the files read by one query
    pub id: usize,
    pub timestamp: String,
    pub username: String,
    pub host_ip: String,
    pub operation: String,
    /// Derived from `json_file`, see [`object_ref_from_json_file`]
    pub object_type: String,
    /// Derived from `json_file`, see [`object_ref_from_json_file`]
    pub identifier: String,
    pub json_file: String,
}

impl AuditEntry {
    /// Case-insensitive substring match over identifier, type, operation and username
    ///
    /// An empty needle matches everything.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            &self.identifier,
            &self.object_type,
            &self.operation,
            &self.username,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Parse every well-formed entry of one log, in file order
///
/// Ids are left at 0; the reader numbers entries across files.
pub fn parse_audit_log(content: &str) -> Vec<AuditEntry> {
    content
        .split(AUDIT_DELIMITER)
        .filter_map(parse_block)
        .collect()
}

fn parse_block(block: &str) -> Option<AuditEntry> {
    let mut entry = AuditEntry::default();
    let mut has_timestamp = false;

    for line in block.lines() {
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim().to_lowercase().as_str() {
            "timestamp" => {
                has_timestamp = !value.is_empty();
                entry.timestamp = value;
            }
            "username" => entry.username = value,
            "host ip" => entry.host_ip = value,
            "operation" => entry.operation = value,
            "json file" => entry.json_file = value,
            _ => {}
        }
    }

    if !has_timestamp {
        return None;
    }

    let (object_type, identifier) = object_ref_from_json_file(&entry.json_file);
    entry.object_type = object_type;
    entry.identifier = identifier;
    Some(entry)
}

/// Guess `(object_type, identifier)` from a record file reference
///
/// Takes the file name, splits it on `_`; the first segment is the type and
/// the rest, rejoined with `_` and without a trailing `.json`, is the
/// identifier. Lossy: sanitized identifiers keep their `_` substitutes.
pub fn object_ref_from_json_file(json_file: &str) -> (String, String) {
    let name = json_file
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(json_file)
        .trim();
    if name.is_empty() {
        return (String::new(), String::new());
    }

    let (object_type, rest) = name.split_once('_').unwrap_or((name, ""));
    let object_type = object_type.strip_suffix(".json").unwrap_or(object_type);
    let identifier = rest.strip_suffix(".json").unwrap_or(rest);
    (object_type.to_string(), identifier.to_string())
}
