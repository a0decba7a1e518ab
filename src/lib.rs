//! NTP Query: a Network Time Protocol version 3 client
//!
//! This library builds a client request, exchanges it with a time server over
//! UDP and derives clock offset and round-trip delay from the four on-wire
//! timestamps (t1 originate, t2 server receive, t3 server transmit, t4 local
//! receive).
pub mod core;
pub mod network;
pub mod protocol;
pub mod sync;
pub mod time;

// Re-export commonly used items
pub use crate::core::{ClientConfig, Error, Result, TransportError, DEFAULT_PORT};
pub use crate::protocol::{decode_response, encode_request, LeapIndicator, Mode, NtpPacket};
pub use crate::sync::{query, request, NtpClient, QueryResult};
pub use crate::time::NtpTimestamp;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
