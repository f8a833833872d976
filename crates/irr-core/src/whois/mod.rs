//! Whois gateway
//!
//! Resolves a server alias through the [`ServerTable`] and forwards one
//! query to the configured [`WhoisClient`]. The query text is sent
//! unmodified and the answer is returned verbatim. No retries, no caching.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ServerTable;
use crate::error::{Error, Result};
use crate::traits::WhoisClient;

/// Raw answer of one whois lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisAnswer {
    /// Response text, verbatim
    pub result: String,
    /// Hostname the query was sent to
    pub server: String,
}

/// Forwards whois queries to aliased registries
#[derive(Clone)]
pub struct WhoisGateway {
    client: Arc<dyn WhoisClient>,
    servers: Arc<ServerTable>,
}

impl WhoisGateway {
    pub fn new(client: Arc<dyn WhoisClient>, servers: Arc<ServerTable>) -> Self {
        Self { client, servers }
    }

    /// Alias table used for resolution
    pub fn servers(&self) -> &ServerTable {
        &self.servers
    }

    /// Send `query_text` to the registry known as `server_alias`
    ///
    /// # Returns
    ///
    /// - `Ok(WhoisAnswer)`: Raw response and resolved hostname
    /// - `Err(Error::InvalidServer)`: Unknown alias
    /// - `Err(Error::Validation)`: Blank query
    /// - `Err(Error::Transport)`: Network failure, from the client
    pub async fn query(&self, server_alias: &str, query_text: &str) -> Result<WhoisAnswer> {
        let entry = self.servers.resolve(server_alias)?;

        if query_text.trim().is_empty() {
            return Err(Error::validation("Whois query cannot be empty"));
        }

        let port = entry.whois_port_or_default();
        tracing::debug!(
            "Whois query to {} ({}:{}): {}",
            server_alias,
            entry.whois_host,
            port,
            query_text
        );

        let result = self.client.query(&entry.whois_host, port, query_text).await?;

        Ok(WhoisAnswer {
            result,
            server: entry.whois_host.clone(),
        })
    }
}

impl std::fmt::Debug for WhoisGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhoisGateway")
            .field("servers", &self.servers.aliases())
            .finish()
    }
}
