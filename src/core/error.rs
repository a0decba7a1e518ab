use std::io;
use std::time::Duration;
use thiserror::Error;

/// Custom error types for the NTP client
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Range error: {0}")]
    Range(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures reported by the datagram transport.
///
/// A missing reply and an unreachable network are separate variants so callers
/// can tell "the server is silent" apart from "the server cannot be reached".
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("failed to bind local socket: {0}")]
    Bind(#[source] io::Error),

    #[error("network unreachable: {0}")]
    Unreachable(#[source] io::Error),

    #[error("no response from {server} within {timeout:?}")]
    Timeout { server: String, timeout: Duration },
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new format error
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Creates a new range error
    pub fn range(msg: impl Into<String>) -> Self {
        Error::Range(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Returns true when the transport gave up waiting for a reply
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Timeout { .. }))
    }
}
