// # Submission Tool Trait
//
// Defines the boundary to the external registry-submission executable.
//
// ## Purpose
//
// The dispatcher tool authenticates against the registry, checks
// authoritativeness and performs the actual mutation. None of that is
// modelled here: the gateway only sees argv in, and exit status, stdout and
// stderr out.
//
// ## Implementations
//
// - Child process: `irr-tool-subprocess` crate
// - Test doubles: scripted tools in `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use irr_core::SubmissionTool;
//
// let result = tool.invoke("radb", Path::new("uploads/rpsl_1.txt")).await;
// if result.exit.is_success() { /* still needs classification */ }
// ```

use async_trait::async_trait;
use std::fmt;
use std::path::Path;

/// How the tool invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitState {
    /// Process ran and exited with this code
    Exited(i32),

    /// Process was terminated by a signal (no exit code)
    Signalled,

    /// Process could not be started
    LaunchFailed(String),

    /// Process exceeded the configured timeout and was killed
    TimedOut,
}

impl ExitState {
    /// `true` only for a clean exit with code 0
    pub fn is_success(&self) -> bool {
        matches!(self, ExitState::Exited(0))
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitState::Exited(code) => write!(f, "exit code {}", code),
            ExitState::Signalled => f.write_str("terminated by signal"),
            ExitState::LaunchFailed(reason) => write!(f, "failed to launch: {}", reason),
            ExitState::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Raw output of one tool invocation
///
/// A non-zero exit or a populated stderr does not by itself mean the
/// registry rejected the change; the classifier decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// How the process ended
    pub exit: ExitState,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,
}

impl DispatchResult {
    /// Create a result for a process that exited with `code`
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit: ExitState::Exited(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a result for a process that never started
    pub fn launch_failed(reason: impl Into<String>) -> Self {
        Self {
            exit: ExitState::LaunchFailed(reason.into()),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Trait for external submission tool implementations
///
/// # Thread Safety
///
/// Implementations must be usable concurrently from multiple tasks; each
/// call is independent.
///
/// # Contract
///
/// - Never fail: launch problems and timeouts are reported through
///   [`ExitState`] so that they reach the classifier.
/// - Do not touch the payload file beyond reading it. Writing and removing
///   it is owned by the dispatcher gateway.
/// - No retries.
#[async_trait]
pub trait SubmissionTool: Send + Sync {
    /// Run the tool against one payload file
    ///
    /// # Parameters
    ///
    /// - `server_alias`: Registry alias the tool should target
    /// - `payload_path`: Location of the transient payload document
    async fn invoke(&self, server_alias: &str, payload_path: &Path) -> DispatchResult;

    /// Short name used in logs
    fn tool_name(&self) -> &str;
}
