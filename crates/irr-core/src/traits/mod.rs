//! Core traits for the IRR gateway
//!
//! This module defines the abstract interfaces at the system's boundaries.
//!
//! - [`SubmissionTool`]: Run the external registry-submission tool
//! - [`WhoisClient`]: Forward a raw whois query
//! - [`ObjectStore`]: Persist object records

pub mod object_store;
pub mod submission_tool;
pub mod whois_client;

pub use object_store::{ObjectRecord, ObjectStatus, ObjectStore, match_id, record_id};
pub use submission_tool::{DispatchResult, ExitState, SubmissionTool};
pub use whois_client::WhoisClient;
