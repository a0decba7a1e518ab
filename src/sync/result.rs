use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::protocol::NtpPacket;
use crate::time::util::seconds_between;

/// Round-trip delay in seconds: `(t4 - t1) - (t3 - t2)`.
///
/// Negative values are possible when either clock misbehaves.
pub fn round_trip_delay(
    t1: DateTime<Utc>,
    t2: DateTime<Utc>,
    t3: DateTime<Utc>,
    t4: DateTime<Utc>,
) -> f64 {
    seconds_between(t4, t1) - seconds_between(t3, t2)
}

/// Clock offset in seconds: `((t2 - t1) + (t3 - t4)) / 2`.
///
/// Positive when the server clock is ahead of the local clock.
pub fn clock_offset(
    t1: DateTime<Utc>,
    t2: DateTime<Utc>,
    t3: DateTime<Utc>,
    t4: DateTime<Utc>,
) -> f64 {
    (seconds_between(t2, t1) + seconds_between(t3, t4)) / 2.0
}

/// Outcome of one request/response exchange
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// t1, when the request left this host
    #[serde(serialize_with = "crate::core::serde::serialize_time")]
    pub local_transmit_instant: DateTime<Utc>,
    /// t4, when the reply arrived
    #[serde(serialize_with = "crate::core::serde::serialize_time")]
    pub local_receive_instant: DateTime<Utc>,
    /// The decoded server response
    pub packet: NtpPacket,
    /// Seconds
    pub round_trip_delay: f64,
    /// Seconds, positive when the server is ahead
    pub clock_offset: f64,
}

impl QueryResult {
    /// Derives delay and offset from the local instants and the server's t2/t3
    pub fn from_exchange(
        local_transmit_instant: DateTime<Utc>,
        local_receive_instant: DateTime<Utc>,
        packet: NtpPacket,
    ) -> Self {
        let t2 = packet.receive_timestamp.to_datetime();
        let t3 = packet.transmit_timestamp.to_datetime();

        QueryResult {
            local_transmit_instant,
            local_receive_instant,
            packet,
            round_trip_delay: round_trip_delay(local_transmit_instant, t2, t3, local_receive_instant),
            clock_offset: clock_offset(local_transmit_instant, t2, t3, local_receive_instant),
        }
    }

    /// t2, when the server received the request
    pub fn server_receive_instant(&self) -> DateTime<Utc> {
        self.packet.receive_timestamp.to_datetime()
    }

    /// t3, when the server sent the reply
    pub fn server_transmit_instant(&self) -> DateTime<Utc> {
        self.packet.transmit_timestamp.to_datetime()
    }

    /// Server's reference timestamp; 1900-01-01 when the server left it unset
    pub fn reference_instant(&self) -> DateTime<Utc> {
        self.packet.reference_timestamp.to_datetime()
    }
}
