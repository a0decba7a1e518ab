use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Configuration for a single NTP query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server host name or address
    pub server: String,
    /// Server UDP port
    pub port: u16,
    /// How long to wait for the reply datagram
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub timeout: Duration,
    /// Local address to bind to. Port 0 picks an ephemeral port; an
    /// unspecified IPv4 address is swapped for `[::]` when the server
    /// resolves to IPv6.
    pub bind_addr: SocketAddr,
}

impl ClientConfig {
    /// Creates a configuration for `server:port` with default timeout and bind address
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        ClientConfig {
            server: server.into(),
            port,
            ..Default::default()
        }
    }

    /// Returns the `host:port` string handed to the resolver
    pub fn server_addr(&self) -> String {
        if self.server.contains(':') && !self.server.starts_with('[') {
            // bare IPv6 literal
            format!("[{}]:{}", self.server, self.port)
        } else {
            format!("{}:{}", self.server, self.port)
        }
    }

    /// Checks that the configuration can be used for a query
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(Error::config("Server name is empty"));
        }
        if self.port == 0 {
            return Err(Error::config("Server port must not be 0"));
        }
        if self.timeout.is_zero() {
            return Err(Error::config("Timeout must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server: super::DEFAULT_SERVER.to_string(),
            port: super::DEFAULT_PORT,
            timeout: super::DEFAULT_TIMEOUT,
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        }
    }
}
