// # Whois Client Trait
//
// Defines the raw whois protocol boundary: one query line out, the whole
// response text back.
//
// ## Implementations
//
// - TCP: `irr-whois-tcp` crate

use async_trait::async_trait;

/// Trait for whois protocol clients
///
/// Implementations forward `query` unmodified and return the response
/// verbatim. No retries, no caching.
#[async_trait]
pub trait WhoisClient: Send + Sync {
    /// Send one query and collect the response
    ///
    /// # Parameters
    ///
    /// - `host`: Whois server hostname
    /// - `port`: Whois server port
    /// - `query`: Query text, sent as-is
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: Raw response text
    /// - `Err(Error::Transport)`: Connection or read failure
    async fn query(&self, host: &str, port: u16, query: &str) -> crate::Result<String>;
}
