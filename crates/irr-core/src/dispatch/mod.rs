//! Dispatcher gateway
//!
//! Owns one invocation of the external submission tool:
//!
//! ```text
//! Pending ──write──▶ Written ──spawn──▶ Invoked ──wait──▶ Captured ──remove──▶ Cleaned
//!    │                  │                                    │
//!    └── write error ───┴──────────── remove (always) ───────┘
//! ```
//!
//! The transient payload file is removed on every exit path, including a
//! failed invocation and a timeout. A filesystem failure while writing or
//! removing the payload is fatal for that call and surfaces as
//! [`Error::Transport`]. Everything the tool itself reports, including a
//! non-zero exit, is returned verbatim for the classifier to judge.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::{DispatcherConfig, ServerTable};
use crate::error::{Error, Result};
use crate::submission::SubmissionPayload;
use crate::traits::submission_tool::{DispatchResult, ExitState, SubmissionTool};

/// Distinguishes payload files of concurrent dispatches within this process
static PAYLOAD_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Lifecycle stage of one dispatch, used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Pending,
    Written,
    Invoked,
    Captured,
    Cleaned,
}

/// Removes the payload file if the dispatch future is dropped mid-flight
struct PayloadGuard {
    path: Option<PathBuf>,
}

impl PayloadGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for PayloadGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take()
            && let Err(e) = std::fs::remove_file(&path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove abandoned payload {}: {}", path.display(), e);
        }
    }
}

/// Runs the submission tool against transient payload files
///
/// Cheap to clone; clones share the tool and the alias table.
#[derive(Clone)]
pub struct DispatcherGateway {
    tool: Arc<dyn SubmissionTool>,
    servers: Arc<ServerTable>,
    work_dir: PathBuf,
    timeout: Option<Duration>,
}

impl DispatcherGateway {
    /// Create a gateway writing payloads below `config.work_dir`
    pub fn new(
        tool: Arc<dyn SubmissionTool>,
        servers: Arc<ServerTable>,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            tool,
            servers,
            work_dir: config.work_dir.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Directory receiving payload files
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Alias table used to validate targets
    pub fn servers(&self) -> &ServerTable {
        &self.servers
    }

    /// Write `payload`, run the tool against `target_server`, then remove the payload
    ///
    /// # Returns
    ///
    /// - `Ok(DispatchResult)`: The tool ran (or failed to launch, or timed out)
    /// - `Err(Error::InvalidServer)`: `target_server` is not in the alias table
    /// - `Err(Error::Transport)`: The payload could not be written or removed
    pub async fn dispatch(
        &self,
        payload: &SubmissionPayload,
        target_server: &str,
    ) -> Result<DispatchResult> {
        self.servers.resolve(target_server)?;

        let path = self.payload_path();
        debug!(stage = ?DispatchStage::Pending, path = %path.display(), "Dispatch");

        let mut guard = PayloadGuard::new(path.clone());

        if let Err(e) = self.write_payload(&path, payload).await {
            guard.disarm();
            self.remove_payload(&path).await.ok();
            return Err(e);
        }
        debug!(stage = ?DispatchStage::Written, path = %path.display(), "Dispatch");

        debug!(
            stage = ?DispatchStage::Invoked,
            tool = self.tool.tool_name(),
            server = target_server,
            "Dispatch"
        );
        let result = self.invoke(target_server, &path).await;
        debug!(stage = ?DispatchStage::Captured, exit = %result.exit, "Dispatch");

        guard.disarm();
        self.remove_payload(&path).await?;
        debug!(stage = ?DispatchStage::Cleaned, path = %path.display(), "Dispatch");

        Ok(result)
    }

    async fn invoke(&self, target_server: &str, path: &Path) -> DispatchResult {
        let call = self.tool.invoke(target_server, path);
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        "Submission tool {} exceeded {:?}, abandoning",
                        self.tool.tool_name(),
                        limit
                    );
                    DispatchResult {
                        exit: ExitState::TimedOut,
                        stdout: String::new(),
                        stderr: String::new(),
                    }
                }
            },
            None => call.await,
        }
    }

    /// Unique payload location: wall-clock millis, pid and a process-wide counter
    fn payload_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seq = PAYLOAD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        self.work_dir
            .join(format!("rpsl_{}_{}_{}.txt", millis, std::process::id(), seq))
    }

    async fn write_payload(&self, path: &Path, payload: &SubmissionPayload) -> Result<()> {
        fs::create_dir_all(&self.work_dir).await.map_err(|e| {
            Error::transport(format!(
                "Failed to create work directory {}: {}",
                self.work_dir.display(),
                e
            ))
        })?;

        let mut file = fs::File::create(path).await.map_err(|e| {
            Error::transport(format!("Failed to create payload {}: {}", path.display(), e))
        })?;
        file.write_all(payload.as_bytes()).await.map_err(|e| {
            Error::transport(format!("Failed to write payload {}: {}", path.display(), e))
        })?;
        file.flush().await.map_err(|e| {
            Error::transport(format!("Failed to flush payload {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    async fn remove_payload(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::transport(format!(
                "Failed to remove payload {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

impl std::fmt::Debug for DispatcherGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherGateway")
            .field("tool", &self.tool.tool_name())
            .field("work_dir", &self.work_dir)
            .field("timeout", &self.timeout)
            .finish()
    }
}
