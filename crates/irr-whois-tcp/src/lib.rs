// # TCP Whois Client
//
// This crate speaks the whois protocol (RFC 3912) for the IRR gateway.
//
// ## Protocol
//
// 1. Connect to `host:port`
// 2. Send the query followed by CRLF
// 3. Read until the server closes the connection
//
// The whole exchange is bounded by one timeout. The response is returned
// verbatim, decoded lossily as UTF-8.

use irr_core::traits::WhoisClient;
use irr_core::{Error, Result};

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default bound on one whois exchange
pub const DEFAULT_WHOIS_TIMEOUT_SECS: u64 = 30;

/// Whois client over plain TCP
#[derive(Debug, Clone)]
pub struct TcpWhoisClient {
    timeout: Duration,
}

impl TcpWhoisClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn exchange(host: &str, port: u16, query: &str) -> Result<String> {
        let mut stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| Error::transport(format!("Failed to connect to {}:{}: {}", host, port, e)))?;

        stream
            .write_all(format!("{}\r\n", query).as_bytes())
            .await
            .map_err(|e| Error::transport(format!("Failed to send query to {}: {}", host, e)))?;

        let mut response = Vec::new();
        stream
            .read_to_end(&mut response)
            .await
            .map_err(|e| Error::transport(format!("Failed to read response from {}: {}", host, e)))?;

        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

impl Default for TcpWhoisClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_WHOIS_TIMEOUT_SECS))
    }
}

#[async_trait]
impl WhoisClient for TcpWhoisClient {
    async fn query(&self, host: &str, port: u16, query: &str) -> Result<String> {
        tracing::debug!("whois {}:{} <- {:?}", host, port, query);

        let response = tokio::time::timeout(self.timeout, Self::exchange(host, port, query))
            .await
            .map_err(|_| {
                Error::transport(format!(
                    "Whois query to {}:{} timed out after {:?}",
                    host, port, self.timeout
                ))
            })??;

        tracing::debug!("whois {}:{} -> {} bytes", host, port, response.len());
        Ok(response)
    }
}
