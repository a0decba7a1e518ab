//! Core types for the NTP client
//!
//! This module contains the error type, the client configuration and the
//! protocol constants shared by the codec, transport and query modules.

pub mod error;
pub mod types;
pub mod serde;

use std::time::Duration;

pub use self::error::{Error, Result, TransportError};
pub use self::types::ClientConfig;

/// NTP version sent in client requests
pub const PROTOCOL_VERSION: u8 = 3;

/// Default NTP server port
pub const DEFAULT_PORT: u16 = 123;

/// Server queried when none is given
pub const DEFAULT_SERVER: &str = "ntp.nict.jp";

/// Default wait for a reply datagram
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Size of an NTP header without extension fields or authenticator
pub const PACKET_SIZE: usize = 48;

/// Receive buffer size; larger than a packet so oversized replies are noticed
pub const MAX_PACKET_SIZE: usize = 1024;

/// Seconds from 1900-01-01T00:00:00Z (NTP epoch) to 1970-01-01T00:00:00Z (Unix epoch)
pub const EPOCH_DELTA: i64 = 2_208_988_800;
