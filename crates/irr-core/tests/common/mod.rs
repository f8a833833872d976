//! Test doubles and common utilities for contract tests
//!
//! The doubles stand in for the external dispatcher tool and the whois
//! protocol client. They record what they were asked to do so tests can
//! check the boundaries without any registry behaviour.

#![allow(dead_code)]

use irr_core::config::{DispatcherConfig, EngineConfig, ServerTable};
use irr_core::error::{Error, Result};
use irr_core::traits::{DispatchResult, SubmissionTool, WhoisClient};
use irr_core::{AuditLogWriter, DispatcherGateway, MemoryObjectStore, SubmissionEngine, SubmissionEvent};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// What the scripted tool observed during one invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub server_alias: String,
    pub payload_path: PathBuf,
    pub payload: String,
    pub payload_existed: bool,
}

/// A SubmissionTool that answers with a canned result
pub struct ScriptedTool {
    result: DispatchResult,
    delay: Option<Duration>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
    completed: Arc<AtomicUsize>,
}

impl ScriptedTool {
    pub fn new(result: DispatchResult) -> Self {
        Self {
            result,
            delay: None,
            invocations: Arc::new(Mutex::new(Vec::new())),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Exit 0 with `stdout`
    pub fn succeeding(stdout: &str) -> Self {
        Self::new(DispatchResult::exited(0, stdout, ""))
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Number of invocations that ran to the end
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SubmissionTool for ScriptedTool {
    async fn invoke(&self, server_alias: &str, payload_path: &Path) -> DispatchResult {
        let payload = std::fs::read_to_string(payload_path).unwrap_or_default();
        self.invocations.lock().unwrap().push(Invocation {
            server_alias: server_alias.to_string(),
            payload_path: payload_path.to_path_buf(),
            payload,
            payload_existed: payload_path.exists(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn tool_name(&self) -> &str {
        "scripted"
    }
}

/// A WhoisClient returning a fixed answer, or failing
pub struct CannedWhoisClient {
    answer: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl CannedWhoisClient {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            answer: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WhoisClient for CannedWhoisClient {
    async fn query(&self, host: &str, port: u16, _query: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .ok_or_else(|| Error::transport(format!("Connection to {}:{} refused", host, port)))
    }
}

/// Engine wired to a scripted tool, an in-memory store and an audit dir
pub struct Harness {
    pub engine: SubmissionEngine,
    pub events: mpsc::Receiver<SubmissionEvent>,
    pub store: Arc<MemoryObjectStore>,
    pub tool: Arc<ScriptedTool>,
    pub work_dir: PathBuf,
    pub logs_dir: PathBuf,
}

pub fn harness(tool: ScriptedTool, root: &Path) -> Harness {
    let tool = Arc::new(tool);
    let store = Arc::new(MemoryObjectStore::new());
    let work_dir = root.join("uploads");
    let logs_dir = root.join("logs");

    let dispatcher = DispatcherGateway::new(
        tool.clone(),
        Arc::new(ServerTable::default()),
        &DispatcherConfig {
            work_dir: work_dir.clone(),
            timeout_secs: None,
        },
    );

    let (engine, events) = SubmissionEngine::new(
        dispatcher,
        store.clone(),
        Arc::new(AuditLogWriter::new(&logs_dir)),
        &EngineConfig::default(),
    )
    .expect("engine construction succeeds");

    Harness {
        engine,
        events,
        store,
        tool,
        work_dir,
        logs_dir,
    }
}

/// Report the registry sends back when it accepted every object
pub const ACCEPTED_REPORT: &str = r#"Submitting objects...
Generated JSON file: objects/route_192_0_2_0_24.json
Response from server: {"summary":{"successful":1,"failed":0},"objects":[{"successful":true,"error_messages":[]}]}
"#;

/// Report the registry sends back when it rejected the object
pub const REJECTED_REPORT: &str = r#"Response from server: {"summary":{"successful":0,"failed":1},"objects":[{"successful":false,"error_messages":["no such object: foo"]}]}"#;

pub const ROUTE_TEXT: &str = "route:  192.0.2.0/24\norigin: AS65000\nmnt-by: MAINT-EXAMPLE\nsource: IRRD\n";

/// Files left in a directory (missing directory counts as empty)
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    }
}
