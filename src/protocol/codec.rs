use bytes::BytesMut;
use chrono::{DateTime, Utc};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::core::{Error, Result, PACKET_SIZE};
use super::message::NtpPacket;

/// Builds the 48-byte client request sent at `local_time`.
///
/// Fails with [`Error::Range`] before anything touches the network when
/// `local_time` has no NTP era 0 representation.
pub fn encode_request(local_time: DateTime<Utc>) -> Result<[u8; PACKET_SIZE]> {
    Ok(NtpPacket::client_request(local_time)?.to_bytes())
}

/// Parses a server response. Any length other than 48 bytes is a format error.
pub fn decode_response(bytes: &[u8]) -> Result<NtpPacket> {
    let packet = NtpPacket::from_bytes(bytes)?;
    trace!(
        header = packet.header_byte(),
        leap = %packet.leap_indicator,
        version = packet.version_number,
        mode = %packet.mode,
        stratum = packet.stratum,
        "decoded NTP packet"
    );
    Ok(packet)
}

/// Datagram codec for NTP packets.
///
/// Each buffer handed to the decoder is one whole datagram; it is consumed
/// entirely and must be exactly one packet long.
#[derive(Debug, Clone, Copy, Default)]
pub struct NtpCodec;

impl NtpCodec {
    /// Creates a new packet codec
    pub fn new() -> Self {
        NtpCodec
    }
}

impl Decoder for NtpCodec {
    type Item = NtpPacket;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }

        let datagram = src.split();
        decode_response(&datagram).map(Some)
    }
}

impl Encoder<NtpPacket> for NtpCodec {
    type Error = Error;

    fn encode(&mut self, item: NtpPacket, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(PACKET_SIZE);
        item.encode(dst);
        Ok(())
    }
}
