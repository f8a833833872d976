// # irr-core
//
// Core library for submitting RPSL objects to Internet Routing Registries.
//
// ## Architecture Overview
//
// This library provides the submission and result-classification path:
// - **SubmissionPayload**: Serializes a change request for the external dispatcher
// - **DispatcherGateway**: Writes the payload, runs the tool, always removes the payload
// - **classify**: Turns raw tool output into a typed SubmissionOutcome
// - **ObjectStore**: Durable record per managed object (file + memory)
// - **AuditLogWriter / AuditLogReader**: Append-only audit trail
// - **WhoisGateway**: Alias-resolved raw whois lookups
// - **SubmissionEngine**: Orchestrates one request end to end
//
// ## Boundaries
//
// The core never spawns processes or opens sockets. The external tool and
// the whois protocol sit behind the `SubmissionTool` and `WhoisClient`
// traits; implementations live in their own crates.

pub mod audit;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod store;
pub mod submission;
pub mod traits;
pub mod whois;

// Re-export core types for convenience
pub use audit::{AuditEntry, AuditLogReader, AuditLogWriter, AuditRecord};
pub use classifier::{OutcomeKind, SubmissionOutcome, Summary, classify};
pub use config::{
    AuditConfig, DispatcherConfig, EngineConfig, IrrConfig, ServerEntry, ServerTable, StoreConfig,
};
pub use dispatch::DispatcherGateway;
pub use engine::{Operator, SubmissionEngine, SubmissionEvent, SubmissionReport};
pub use error::{Error, Result};
pub use store::{FileObjectStore, MemoryObjectStore};
pub use submission::{Action, ChangeRequest, ObjectType, SubmissionPayload};
pub use traits::{
    DispatchResult, ExitState, ObjectRecord, ObjectStatus, ObjectStore, SubmissionTool,
    WhoisClient,
};
pub use whois::{WhoisAnswer, WhoisGateway};
