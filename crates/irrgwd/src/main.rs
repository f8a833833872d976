// # irrgwd - IRR Gateway Daemon
//
// Thin HTTP integration layer over irr-core. Submission, classification,
// storage and audit logic all live in irr-core; this binary only wires the
// concrete implementations together and serves them.
//
// The irrgwd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building the dispatcher tool, whois client, object store and audit log
// 4. Serving the HTTP API until SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### HTTP
// - `IRR_LISTEN_ADDR`: Bind address (default 127.0.0.1:8081)
//
// ### Dispatcher
// - `IRR_TOOL_PROGRAM`: Dispatcher executable (required)
// - `IRR_TOOL_ARGS`: Whitespace-separated arguments placed before the alias
// - `IRR_TOOL_INSTANCE_FLAG`: Option preceding the alias (e.g. `--instance`)
// - `IRR_TOOL_TIMEOUT_SECS`: Kill the dispatcher after this many seconds
// - `IRR_WORK_DIR`: Transient payload directory (default uploads)
//
// ### Storage
// - `IRR_OBJECTS_DIR`: Object record directory (default objects)
// - `IRR_LOGS_DIR`: Audit log directory (default logs)
//
// ### Servers
// - `IRR_SERVERS_FILE`: JSON file replacing the built-in server table
// - `IRR_DEFAULT_SERVER`: Alias used when a request names none
// - `IRR_WHOIS_TIMEOUT_SECS`: Whois connect+read timeout (default 30)
//
// ### Logging
// - `IRR_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export IRR_TOOL_PROGRAM=/usr/bin/python3
// export IRR_TOOL_ARGS=/opt/irr/irr_rpsl_submit.py
// export IRR_TOOL_INSTANCE_FLAG=--instance
// export IRR_DEFAULT_SERVER=radb
//
// irrgwd
// ```

mod routes;

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use irr_core::{
    AuditLogReader, AuditLogWriter, DispatcherGateway, FileObjectStore, IrrConfig, ServerTable,
    SubmissionEngine, SubmissionEvent, WhoisGateway,
};
use irr_tool_subprocess::ProcessSubmissionTool;
use irr_whois_tcp::{DEFAULT_WHOIS_TIMEOUT_SECS, TcpWhoisClient};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum IrrExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<IrrExitCode> for ExitCode {
    fn from(code: IrrExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    listen_addr: String,
    tool_program: String,
    tool_args: Vec<String>,
    tool_instance_flag: Option<String>,
    tool_timeout_secs: Option<u64>,
    work_dir: PathBuf,
    objects_dir: PathBuf,
    logs_dir: PathBuf,
    servers_file: Option<PathBuf>,
    default_server: Option<String>,
    whois_timeout_secs: u64,
    log_level: String,
    default_username: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            listen_addr: env::var("IRR_LISTEN_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8081".to_string()),
            tool_program: env::var("IRR_TOOL_PROGRAM").context("IRR_TOOL_PROGRAM is not set")?,
            tool_args: env::var("IRR_TOOL_ARGS")
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            tool_instance_flag: non_empty_var("IRR_TOOL_INSTANCE_FLAG"),
            tool_timeout_secs: parse_var("IRR_TOOL_TIMEOUT_SECS")?,
            work_dir: env::var("IRR_WORK_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            objects_dir: env::var("IRR_OBJECTS_DIR")
                .unwrap_or_else(|_| "objects".to_string())
                .into(),
            logs_dir: env::var("IRR_LOGS_DIR")
                .unwrap_or_else(|_| "logs".to_string())
                .into(),
            servers_file: non_empty_var("IRR_SERVERS_FILE").map(PathBuf::from),
            default_server: non_empty_var("IRR_DEFAULT_SERVER"),
            whois_timeout_secs: parse_var("IRR_WHOIS_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_WHOIS_TIMEOUT_SECS),
            log_level: env::var("IRR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            default_username: non_empty_var("LOGNAME")
                .or_else(|| non_empty_var("USER"))
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.tool_program.trim().is_empty() {
            anyhow::bail!(
                "IRR_TOOL_PROGRAM is required. \
                Set it via: export IRR_TOOL_PROGRAM=/path/to/dispatcher"
            );
        }

        if self.listen_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!(
                "IRR_LISTEN_ADDR must be an address like 127.0.0.1:8081. Got: {}",
                self.listen_addr
            );
        }

        if let Some(timeout) = self.tool_timeout_secs
            && !(1..=3600).contains(&timeout)
        {
            anyhow::bail!(
                "IRR_TOOL_TIMEOUT_SECS must be between 1 and 3600 seconds. Got: {}",
                timeout
            );
        }

        if !(1..=300).contains(&self.whois_timeout_secs) {
            anyhow::bail!(
                "IRR_WHOIS_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.whois_timeout_secs
            );
        }

        if let Some(ref path) = self.servers_file
            && !path.exists()
        {
            anyhow::bail!("IRR_SERVERS_FILE does not exist: {}", path.display());
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "IRR_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Core configuration assembled from the environment
    fn irr_config(&self) -> Result<IrrConfig> {
        let mut servers = match &self.servers_file {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str::<ServerTable>(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            None => ServerTable::default(),
        };
        if let Some(primary) = &self.default_server {
            servers = servers.with_primary(primary.clone());
        }

        let mut config = IrrConfig::new();
        config.servers = servers;
        config.dispatcher.work_dir = self.work_dir.clone();
        config.store.objects_dir = self.objects_dir.clone();
        config.audit.logs_dir = self.logs_dir.clone();

        config.validate()?;
        Ok(config)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var(name: &str) -> Result<Option<u64>> {
    match non_empty_var(name) {
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a number. Got: {}", name, v)),
        None => Ok(None),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return IrrExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return IrrExitCode::ConfigError.into();
    }

    let irr_config = match config.irr_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return IrrExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IrrExitCode::ConfigError.into();
    }

    info!("Starting irrgwd daemon");
    info!(
        "Servers: {} (primary: {})",
        irr_config.servers.aliases().join(", "),
        irr_config.servers.primary
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IrrExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config, irr_config).await {
            error!("Daemon error: {:#}", e);
            IrrExitCode::RuntimeError
        } else {
            IrrExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config, irr_config: IrrConfig) -> Result<()> {
    let servers = Arc::new(irr_config.servers.clone());

    let mut tool = ProcessSubmissionTool::new(&config.tool_program)?
        .with_leading_args(config.tool_args.clone());
    if let Some(flag) = &config.tool_instance_flag {
        tool = tool.with_instance_flag(flag.clone());
    }
    if let Some(secs) = config.tool_timeout_secs {
        tool = tool.with_timeout(Duration::from_secs(secs));
    }
    info!("Dispatcher: {} {:?}", config.tool_program, config.tool_args);

    let dispatcher =
        DispatcherGateway::new(Arc::new(tool), servers.clone(), &irr_config.dispatcher);
    let store = FileObjectStore::new(&irr_config.store.objects_dir).await?;
    let audit_writer = AuditLogWriter::new(&irr_config.audit.logs_dir);

    let (engine, events) = SubmissionEngine::new(
        dispatcher,
        Arc::new(store),
        Arc::new(audit_writer),
        &irr_config.engine,
    )?;
    tokio::spawn(log_events(events));

    let whois_client = TcpWhoisClient::new(Duration::from_secs(config.whois_timeout_secs));

    let state = Arc::new(routes::AppState {
        engine,
        whois: WhoisGateway::new(Arc::new(whois_client), servers),
        audit: AuditLogReader::new(&irr_config.audit.logs_dir),
        default_username: config.default_username.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("Listening on http://{}", config.listen_addr);

    axum::serve(
        listener,
        routes::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Log submission events until the engine goes away
async fn log_events(mut events: mpsc::Receiver<SubmissionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SubmissionEvent::Dispatched {
                record_id,
                action,
                server,
            } => debug!("{} {} dispatched to {}", action, record_id, server),
            SubmissionEvent::Submitted { record_id, server } => {
                info!("{} accepted by {}", record_id, server)
            }
            SubmissionEvent::Rejected {
                record_id,
                kind,
                message,
            } => warn!("{} rejected ({}): {}", record_id, kind, message),
            SubmissionEvent::BookkeepingFailed { record_id, error } => {
                error!("{} outcome not recorded: {}", record_id, error)
            }
        }
    }
}

/// Resolves once a shutdown signal arrives
async fn shutdown_signal() {
    shutdown_on(wait_for_shutdown()).await
}

/// Resolves when `wait` yields a signal; never resolves if it fails, so a
/// missing signal handler cannot stop the server
async fn shutdown_on<F>(wait: F)
where
    F: std::future::Future<Output = Result<&'static str>>,
{
    match wait.await {
        Ok(signal) => info!("Received shutdown signal: {}", signal),
        Err(e) => {
            error!("Shutdown error: {}", e);
            std::future::pending::<()>().await
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_signal_setup_keeps_serving() {
        let wait = async { Err::<&'static str, _>(anyhow::anyhow!("Failed to setup SIGTERM")) };
        let shutdown = tokio::time::timeout(Duration::from_millis(100), shutdown_on(wait)).await;
        assert!(shutdown.is_err(), "shutdown must not fire without a signal");
    }

    #[tokio::test]
    async fn test_signal_triggers_shutdown() {
        let wait = async { Ok::<_, anyhow::Error>("SIGTERM") };
        let shutdown = tokio::time::timeout(Duration::from_millis(100), shutdown_on(wait)).await;
        assert!(shutdown.is_ok());
    }
}
