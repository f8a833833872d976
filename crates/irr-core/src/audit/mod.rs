//! Audit trail
//!
//! One append-only entry per dispatch attempt. Writing and reading are
//! separate roles: the engine owns an [`AuditLogWriter`], the HTTP layer
//! queries through an [`AuditLogReader`].

pub mod entry;
pub mod reader;
pub mod writer;

pub use entry::{AUDIT_DELIMITER, AuditEntry, object_ref_from_json_file, parse_audit_log};
pub use reader::AuditLogReader;
pub use writer::{AUDIT_TIMESTAMP_FORMAT, AuditLogWriter, AuditRecord};
