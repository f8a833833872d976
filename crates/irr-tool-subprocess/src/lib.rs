// # Subprocess Submission Tool
//
// This crate runs the external IRR dispatcher executable as a child process.
//
// ## Invocation
//
// ```text
// <program> [leading args...] [instance flag] <server alias> <payload path>
// ```
//
// Leading args carry e.g. the script path when the program is an
// interpreter. The instance flag is for dispatchers that take the alias as
// an option (`--instance radb`) rather than positionally.
//
// ## Behaviour
//
// - stdin is closed, stdout and stderr are captured and decoded lossily
// - a spawn failure is reported as `ExitState::LaunchFailed`
// - on timeout the child is killed and `ExitState::TimedOut` is reported
// - the child is killed if the invocation future is dropped

use irr_core::traits::{DispatchResult, ExitState, SubmissionTool};
use irr_core::{Error, Result};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs the dispatcher executable once per submission
#[derive(Debug, Clone)]
pub struct ProcessSubmissionTool {
    /// Executable to run
    program: PathBuf,

    /// Arguments placed before the alias
    leading_args: Vec<String>,

    /// Option name preceding the alias, if the tool wants one
    instance_flag: Option<String>,

    /// Upper bound on one run
    timeout: Option<Duration>,

    /// Display name for logs
    name: String,
}

impl ProcessSubmissionTool {
    /// Create a tool running `program` with no extra arguments and no timeout
    ///
    /// # Errors
    ///
    /// `Error::Config` when `program` is empty.
    pub fn new(program: impl Into<PathBuf>) -> Result<Self> {
        let program = program.into();
        if program.as_os_str().is_empty() {
            return Err(Error::config("Dispatcher program cannot be empty"));
        }

        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());

        Ok(Self {
            program,
            leading_args: Vec::new(),
            instance_flag: None,
            timeout: None,
            name,
        })
    }

    /// Arguments placed before the alias
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Pass the alias as `<flag> <alias>` instead of positionally
    pub fn with_instance_flag(mut self, flag: impl Into<String>) -> Self {
        self.instance_flag = Some(flag.into());
        self
    }

    /// Kill the child after `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full argument vector (without the program) for one run
    pub fn args_for(&self, server_alias: &str, payload_path: &Path) -> Vec<String> {
        let mut args = self.leading_args.clone();
        if let Some(flag) = &self.instance_flag {
            args.push(flag.clone());
        }
        args.push(server_alias.to_string());
        args.push(payload_path.display().to_string());
        args
    }
}

#[async_trait]
impl SubmissionTool for ProcessSubmissionTool {
    async fn invoke(&self, server_alias: &str, payload_path: &Path) -> DispatchResult {
        let args = self.args_for(server_alias, payload_path);
        tracing::debug!("Running {} {:?}", self.program.display(), args);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("Failed to start {}: {}", self.program.display(), e);
                return DispatchResult::launch_failed(e.to_string());
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => {
                    tracing::warn!("{} exceeded {:?}, killed", self.name, limit);
                    return DispatchResult {
                        exit: ExitState::TimedOut,
                        stdout: String::new(),
                        stderr: String::new(),
                    };
                }
            },
            None => child.wait_with_output().await,
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Failed to collect output of {}: {}", self.name, e);
                return DispatchResult {
                    exit: ExitState::Signalled,
                    stdout: String::new(),
                    stderr: e.to_string(),
                };
            }
        };

        let exit = match output.status.code() {
            Some(code) => ExitState::Exited(code),
            None => ExitState::Signalled,
        };
        tracing::debug!("{} finished: {}", self.name, exit);

        DispatchResult {
            exit,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    fn tool_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_program_is_rejected() {
        assert!(ProcessSubmissionTool::new("").is_err());
    }

    #[test]
    fn test_args_layout() {
        let tool = ProcessSubmissionTool::new("/usr/bin/python3")
            .unwrap()
            .with_leading_args(["irr_rpsl_submit.py"])
            .with_instance_flag("--instance");
        assert_eq!(
            tool.args_for("radb", Path::new("uploads/rpsl_1.txt")),
            vec!["irr_rpsl_submit.py", "--instance", "radb", "uploads/rpsl_1.txt"]
        );
        assert_eq!(tool.tool_name(), "python3");

        let positional = ProcessSubmissionTool::new("dispatch").unwrap();
        assert_eq!(
            positional.args_for("irrd", Path::new("p.txt")),
            vec!["irrd", "p.txt"]
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_failure() {
        let tool = ProcessSubmissionTool::new("/nonexistent/irr-dispatcher").unwrap();
        let result = tool.invoke("irrd", Path::new("payload.txt")).await;
        assert!(matches!(result.exit, ExitState::LaunchFailed(_)));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use tempfile::tempdir;

        fn sh(script: &str) -> ProcessSubmissionTool {
            ProcessSubmissionTool::new("/bin/sh")
                .unwrap()
                .with_leading_args(["-c", script, "dispatcher"])
        }

        #[tokio::test]
        async fn test_captures_output_and_exit_code() {
            let dir = tempdir().unwrap();
            let payload = dir.path().join("payload.txt");
            std::fs::write(&payload, "action: add\n").unwrap();

            let tool = sh(r#"echo "alias=$1"; cat "$2"; echo "oops" >&2; exit 3"#);
            let result = tool.invoke("radb", &payload).await;

            assert_eq!(result.exit, ExitState::Exited(3));
            assert_eq!(result.stdout, "alias=radb\naction: add\n");
            assert_eq!(result.stderr, "oops\n");
        }

        #[tokio::test]
        async fn test_non_utf8_output_is_decoded_lossily() {
            let tool = sh(r#"printf 'ok \377\n'"#);
            let result = tool.invoke("irrd", Path::new("unused")).await;
            assert_eq!(result.exit, ExitState::Exited(0));
            assert!(result.stdout.starts_with("ok "));
            assert!(result.stdout.contains('\u{FFFD}'));
        }

        #[tokio::test]
        async fn test_timeout_kills_child() {
            let tool = sh("sleep 30").with_timeout(Duration::from_millis(200));
            let started = std::time::Instant::now();
            let result = tool.invoke("irrd", Path::new("unused")).await;
            assert_eq!(result.exit, ExitState::TimedOut);
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[tokio::test]
        async fn test_signalled_child() {
            let tool = sh("kill -9 $$");
            let result = tool.invoke("irrd", Path::new("unused")).await;
            assert_eq!(result.exit, ExitState::Signalled);
        }
    }
}
