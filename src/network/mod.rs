//! Network transport module
//!
//! The query core only needs "send these bytes, give me the reply". This
//! module defines that seam and the UDP implementation used by
//! [`crate::NtpClient`]. Timeouts live here, not in the core.

mod connection;

pub use self::connection::UdpTransport;

use bytes::Bytes;
use std::future::Future;

use crate::core::Result;

/// A request/response datagram exchange with one server
pub trait Transport: Send + Sync {
    /// Sends `request` and waits for a single reply datagram.
    ///
    /// Implementations report a missing reply as
    /// [`TransportError::Timeout`](crate::TransportError::Timeout) and a
    /// failed send or receive as
    /// [`TransportError::Unreachable`](crate::TransportError::Unreachable).
    fn send_and_receive(&self, request: Bytes) -> impl Future<Output = Result<Bytes>> + Send;
}

