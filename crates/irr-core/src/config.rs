//! Configuration types for the IRR gateway
//!
//! All configuration is immutable once constructed and is handed to the
//! components that need it (dispatcher, whois gateway, engine) through their
//! constructors. Nothing here is process-global.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Well-known whois TCP port, used when an alias has no explicit port
pub const WHOIS_DEFAULT_PORT: u16 = 43;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IrrConfig {
    /// Registry alias table
    #[serde(default)]
    pub servers: ServerTable,

    /// Transient payload handling for the dispatcher
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Object record storage
    #[serde(default)]
    pub store: StoreConfig,

    /// Audit log location
    #[serde(default)]
    pub audit: AuditConfig,

    /// Submission engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl IrrConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.servers.validate()?;
        self.dispatcher.validate()?;

        if self.engine.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

/// Network coordinates and display name of one registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Human-readable registry name
    pub name: String,

    /// Host answering whois queries
    pub whois_host: String,

    /// Whois port; `None` means [`WHOIS_DEFAULT_PORT`]
    #[serde(default)]
    pub whois_port: Option<u16>,
}

impl ServerEntry {
    /// Create a new entry
    pub fn new(name: impl Into<String>, whois_host: impl Into<String>, whois_port: Option<u16>) -> Self {
        Self {
            name: name.into(),
            whois_host: whois_host.into(),
            whois_port,
        }
    }

    /// Port to connect to for whois queries
    pub fn whois_port_or_default(&self) -> u16 {
        self.whois_port.unwrap_or(WHOIS_DEFAULT_PORT)
    }
}

/// Fixed alias table mapping a logical server alias to its coordinates
///
/// The same aliases are used for submissions (forwarded to the external
/// dispatcher tool) and for whois lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTable {
    /// Alias used when a request names no server
    #[serde(default = "default_primary")]
    pub primary: String,

    /// Known aliases
    pub servers: BTreeMap<String, ServerEntry>,
}

impl ServerTable {
    /// Create a table from explicit entries
    pub fn new(primary: impl Into<String>, servers: BTreeMap<String, ServerEntry>) -> Self {
        Self {
            primary: primary.into(),
            servers,
        }
    }

    /// Replace the primary alias
    pub fn with_primary(mut self, primary: impl Into<String>) -> Self {
        self.primary = primary.into();
        self
    }

    /// Look up an alias
    pub fn resolve(&self, alias: &str) -> Result<&ServerEntry> {
        self.servers
            .get(alias)
            .ok_or_else(|| Error::invalid_server(alias))
    }

    /// Resolve an optional alias, falling back to the primary one
    ///
    /// Returns the alias actually selected together with its entry.
    pub fn select<'a>(&'a self, alias: Option<&'a str>) -> Result<(&'a str, &'a ServerEntry)> {
        let alias = match alias.map(str::trim) {
            Some(a) if !a.is_empty() => a,
            _ => self.primary.as_str(),
        };
        Ok((alias, self.resolve(alias)?))
    }

    /// All configured aliases, sorted
    pub fn aliases(&self) -> Vec<&str> {
        self.servers.keys().map(String::as_str).collect()
    }

    /// Validate the table
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(Error::config("Server table cannot be empty"));
        }

        if !self.servers.contains_key(&self.primary) {
            return Err(Error::config(format!(
                "Primary server '{}' is not in the server table",
                self.primary
            )));
        }

        for (alias, entry) in &self.servers {
            if alias.trim().is_empty() {
                return Err(Error::config("Server alias cannot be empty"));
            }
            if entry.whois_host.trim().is_empty() {
                return Err(Error::config(format!(
                    "Server '{}' has an empty whois host",
                    alias
                )));
            }
            if entry.whois_port == Some(0) {
                return Err(Error::config(format!("Server '{}' has whois port 0", alias)));
            }
        }

        Ok(())
    }
}

impl Default for ServerTable {
    fn default() -> Self {
        let mut servers = BTreeMap::new();
        servers.insert(
            "irrd".to_string(),
            ServerEntry::new("Local IRRd", "localhost", Some(8043)),
        );
        servers.insert(
            "altdb".to_string(),
            ServerEntry::new("ALTDB", "whois.altdb.net", None),
        );
        servers.insert(
            "radb".to_string(),
            ServerEntry::new("RADB", "whois.radb.net", None),
        );
        servers.insert("tc".to_string(), ServerEntry::new("TC IRR", "bgp.net.br", None));

        Self {
            primary: default_primary(),
            servers,
        }
    }
}

fn default_primary() -> String {
    "irrd".to_string()
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Directory receiving transient payload files
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Optional upper bound on one tool invocation (in seconds)
    ///
    /// When unset a hung tool blocks its request until it exits.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl DispatcherConfig {
    /// Validate the dispatcher configuration
    pub fn validate(&self) -> Result<()> {
        if self.work_dir.as_os_str().is_empty() {
            return Err(Error::config("Dispatcher work directory cannot be empty"));
        }
        if self.timeout_secs == Some(0) {
            return Err(Error::config("Dispatcher timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            timeout_secs: None,
        }
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("uploads")
}

/// Object record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one JSON file per object record
    #[serde(default = "default_objects_dir")]
    pub objects_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            objects_dir: default_objects_dir(),
        }
    }
}

fn default_objects_dir() -> PathBuf {
    PathBuf::from("objects")
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Directory holding `audit_*.log` files
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            logs_dir: default_logs_dir(),
        }
    }
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the submission event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_matches_known_registries() {
        let table = ServerTable::default();
        assert_eq!(table.aliases(), vec!["altdb", "irrd", "radb", "tc"]);

        let irrd = table.resolve("irrd").unwrap();
        assert_eq!(irrd.whois_host, "localhost");
        assert_eq!(irrd.whois_port_or_default(), 8043);

        let radb = table.resolve("radb").unwrap();
        assert_eq!(radb.whois_port, None);
        assert_eq!(radb.whois_port_or_default(), WHOIS_DEFAULT_PORT);
    }

    #[test]
    fn test_unknown_alias_is_invalid_server() {
        let table = ServerTable::default();
        let err = table.resolve("ripe").unwrap_err();
        assert!(matches!(err, Error::InvalidServer(alias) if alias == "ripe"));
    }

    #[test]
    fn test_select_falls_back_to_primary() {
        let table = ServerTable::default().with_primary("tc");
        let (alias, entry) = table.select(None).unwrap();
        assert_eq!(alias, "tc");
        assert_eq!(entry.whois_host, "bgp.net.br");

        let (alias, _) = table.select(Some("  ")).unwrap();
        assert_eq!(alias, "tc");

        let (alias, _) = table.select(Some("altdb")).unwrap();
        assert_eq!(alias, "altdb");
    }

    #[test]
    fn test_validate_rejects_missing_primary() {
        let table = ServerTable::default().with_primary("nowhere");
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_table_deserializes_without_primary() {
        let json = r#"{"servers": {"irrd": {"name": "Local", "whois_host": "127.0.0.1", "whois_port": 4343}}}"#;
        let table: ServerTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.primary, "irrd");
        assert!(table.validate().is_ok());
        assert_eq!(table.resolve("irrd").unwrap().whois_port_or_default(), 4343);
    }

    #[test]
    fn test_config_validation() {
        let mut config = IrrConfig::new();
        assert!(config.validate().is_ok());

        config.dispatcher.timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }
}
