//! Submission engine
//!
//! The SubmissionEngine drives one change request end to end:
//! - Resolving the target server alias
//! - Building the payload document
//! - Recording the object as pending
//! - Dispatching through the external tool
//! - Classifying the tool's output
//! - Recording the final status and an audit entry
//!
//! ## Architecture
//!
//! ```text
//!  ChangeRequest
//!       │
//!       ▼
//! ┌──────────────┐   payload   ┌────────────────────┐   DispatchResult   ┌────────────┐
//! │ Payload      │────────────▶│ DispatcherGateway  │───────────────────▶│ classify() │
//! │ builder      │             │ (spawned task)     │                    └────────────┘
//! └──────────────┘             └────────────────────┘                          │
//!                                                                   SubmissionOutcome
//!         ┌─────────────────────────────┬──────────────────────────────┤
//!         ▼                             ▼                              ▼
//! ┌──────────────┐             ┌────────────────┐              ┌─────────────┐
//! │ ObjectStore  │             │ AuditLogWriter │              │   Events    │
//! └──────────────┘             └────────────────┘              └─────────────┘
//! ```
//!
//! ## Failure handling
//!
//! Validation and alias errors are returned before anything is written.
//! Once the tool has been dispatched, the classified outcome is what the
//! caller gets: failing to record it is logged, not returned.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditLogWriter, AuditRecord};
use crate::classifier::{OutcomeKind, SubmissionOutcome, classify};
use crate::config::EngineConfig;
use crate::dispatch::DispatcherGateway;
use crate::error::{Error, Result};
use crate::submission::{Action, ChangeRequest, SubmissionPayload};
use crate::traits::{ObjectRecord, ObjectStatus, ObjectStore};

/// Events emitted by the SubmissionEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    /// Payload handed to the dispatcher
    Dispatched {
        record_id: String,
        action: Action,
        server: String,
    },

    /// Registry accepted the change
    Submitted {
        record_id: String,
        server: String,
    },

    /// Registry rejected the change or it could not be delivered
    Rejected {
        record_id: String,
        kind: OutcomeKind,
        message: String,
    },

    /// Outcome could not be recorded in the store or the audit log
    BookkeepingFailed {
        record_id: String,
        error: String,
    },
}

/// Who asked for a change, as written to the audit log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub username: String,
    pub host_ip: String,
}

impl Operator {
    pub fn new(username: impl Into<String>, host_ip: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            host_ip: host_ip.into(),
        }
    }
}

/// Result of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    /// Id of the object record written for this request
    pub record_id: String,
    /// Server alias the change was dispatched to
    pub server: String,
    /// Classified outcome
    pub outcome: SubmissionOutcome,
}

/// Orchestrates submissions
///
/// Each call to [`SubmissionEngine::submit`] is independent; the engine can
/// be shared across request handlers behind an `Arc`.
pub struct SubmissionEngine {
    inner: Arc<EngineInner>,
}

/// State shared between the engine and its completion tasks
struct EngineInner {
    dispatcher: DispatcherGateway,
    store: Arc<dyn ObjectStore>,
    audit: Arc<AuditLogWriter>,
    event_tx: mpsc::Sender<SubmissionEvent>,
}

impl SubmissionEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields submission events
    pub fn new(
        dispatcher: DispatcherGateway,
        store: Arc<dyn ObjectStore>,
        audit: Arc<AuditLogWriter>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<SubmissionEvent>)> {
        if config.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            inner: Arc::new(EngineInner {
                dispatcher,
                store,
                audit,
                event_tx: tx,
            }),
        };

        Ok((engine, rx))
    }

    /// Object store records are written to
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.inner.store
    }

    /// Submit one change request
    ///
    /// Everything after the pending record is written runs on its own task:
    /// dropping the returned future neither interrupts the tool nor skips the
    /// final record, the audit entry or payload cleanup.
    ///
    /// # Returns
    ///
    /// - `Ok(SubmissionReport)`: The request was dispatched and classified;
    ///   registry rejections are reported in `outcome`, not as errors
    /// - `Err(Error::Validation)`: Missing object text or identifier
    /// - `Err(Error::InvalidServer)`: Unknown target alias
    /// - `Err(Error::Store)`: The pending record could not be written
    pub async fn submit(
        &self,
        request: ChangeRequest,
        operator: &Operator,
    ) -> Result<SubmissionReport> {
        let inner = &self.inner;
        let (alias, _) = inner
            .dispatcher
            .servers()
            .select(request.target_server.as_deref())?;
        let server = alias.to_string();

        let payload = SubmissionPayload::build(&request)?;
        let identifier = request.resolve_identifier()?;

        if request.action != Action::Delete && request.first_password().is_none() {
            warn!(
                "{} of {} {} carries no password, the registry will likely refuse it",
                request.action, request.object_type, identifier
            );
        }

        let mut record = ObjectRecord::pending(
            request.object_type,
            identifier,
            request.action,
            request.object_text,
        );
        record.server = Some(server.clone());
        record.multiple_routes = request.multiple_routes;
        inner.store.put(&record).await?;

        debug!("Dispatching {} ({}) to {}", record.id, request.action, server);
        inner.emit_event(SubmissionEvent::Dispatched {
            record_id: record.id.clone(),
            action: request.action,
            server: server.clone(),
        });

        let task = Arc::clone(inner);
        let operator = operator.clone();
        let handle =
            tokio::spawn(async move { task.complete(payload, record, server, &operator).await });

        handle
            .await
            .map_err(|e| Error::transport(format!("Submission task failed: {}", e)))
    }
}

impl EngineInner {
    /// Dispatch, classify, record the outcome and report it
    async fn complete(
        &self,
        payload: SubmissionPayload,
        mut record: ObjectRecord,
        server: String,
        operator: &Operator,
    ) -> SubmissionReport {
        let outcome = match self.dispatcher.dispatch(&payload, &server).await {
            Ok(result) => classify(&result),
            Err(e) => {
                error!("Dispatch failed: {}", e);
                SubmissionOutcome::transport_error(e.to_string())
            }
        };

        record.transition(if outcome.kind.is_success() {
            ObjectStatus::Submitted
        } else {
            ObjectStatus::Failed
        });
        record.message = Some(outcome.message.clone());
        record.generated_json_file = outcome.generated_json_file.clone();

        self.record_outcome(&record, operator).await;

        info!(
            "Submission {} {} via {}: {}",
            record.action, record.id, server, outcome.kind
        );

        if outcome.kind.is_success() {
            self.emit_event(SubmissionEvent::Submitted {
                record_id: record.id.clone(),
                server: server.clone(),
            });
        } else {
            self.emit_event(SubmissionEvent::Rejected {
                record_id: record.id.clone(),
                kind: outcome.kind,
                message: outcome.message.clone(),
            });
        }

        SubmissionReport {
            record_id: record.id,
            server,
            outcome,
        }
    }

    /// Persist the final record and append the audit entry, logging failures
    async fn record_outcome(&self, record: &ObjectRecord, operator: &Operator) {
        if let Err(e) = self.store.put(record).await {
            error!("Failed to record outcome of {}: {}", record.id, e);
            self.emit_event(SubmissionEvent::BookkeepingFailed {
                record_id: record.id.clone(),
                error: e.to_string(),
            });
        }

        let entry = AuditRecord {
            username: operator.username.clone(),
            host_ip: operator.host_ip.clone(),
            operation: record.action.to_string(),
            json_file: self.store.reference(&record.id),
        };
        if let Err(e) = self.audit.append(&entry).await {
            error!("Failed to audit submission of {}: {}", record.id, e);
            self.emit_event(SubmissionEvent::BookkeepingFailed {
                record_id: record.id.clone(),
                error: e.to_string(),
            });
        }
    }

    /// Emit an event (non-blocking)
    ///
    /// If the event channel is full, the event is dropped and a warning is logged.
    fn emit_event(&self, event: SubmissionEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping submission event");
        }
    }
}

impl std::fmt::Debug for SubmissionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionEngine")
            .field("dispatcher", &self.inner.dispatcher)
            .field("audit", &self.inner.audit)
            .finish()
    }
}
