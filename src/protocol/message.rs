use bytes::{Buf, BufMut};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;

use crate::core::{Error, Result, PACKET_SIZE, PROTOCOL_VERSION};
use crate::time::NtpTimestamp;

/// 2-bit leap second warning, packed into the top of the first header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LeapIndicator {
    /// No leap second pending
    NoWarning,
    /// Last minute of the day has 61 seconds
    AddOne,
    /// Last minute of the day has 59 seconds
    SubOne,
    /// Clock unsynchronized
    Unsynchronized,
    /// A value with no assigned meaning
    Unknown(u8),
}

impl LeapIndicator {
    /// Maps the 2-bit wire value. Never fails.
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::AddOne,
            2 => LeapIndicator::SubOne,
            3 => LeapIndicator::Unsynchronized,
            other => LeapIndicator::Unknown(other),
        }
    }

    /// The 2-bit wire value
    pub fn bits(&self) -> u8 {
        match self {
            LeapIndicator::NoWarning => 0,
            LeapIndicator::AddOne => 1,
            LeapIndicator::SubOne => 2,
            LeapIndicator::Unsynchronized => 3,
            LeapIndicator::Unknown(bits) => bits & 0b11,
        }
    }

    /// Human-readable label
    pub fn description(&self) -> &'static str {
        match self {
            LeapIndicator::NoWarning => "no warning",
            LeapIndicator::AddOne => "last minute of the day has 61 seconds",
            LeapIndicator::SubOne => "last minute of the day has 59 seconds",
            LeapIndicator::Unsynchronized => "unknown (clock unsynchronized)",
            LeapIndicator::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for LeapIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// 3-bit association mode, packed into the bottom of the first header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    Reserved,
    SymmetricActive,
    SymmetricPassive,
    Client,
    Server,
    Broadcast,
    /// Reserved for NTP control messages
    Control,
    /// Reserved for private use
    Private,
    /// A value with no assigned meaning
    Unknown(u8),
}

impl Mode {
    /// Maps the 3-bit wire value. Never fails.
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Mode::Reserved,
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::Control,
            7 => Mode::Private,
            other => Mode::Unknown(other),
        }
    }

    /// The 3-bit wire value
    pub fn bits(&self) -> u8 {
        match self {
            Mode::Reserved => 0,
            Mode::SymmetricActive => 1,
            Mode::SymmetricPassive => 2,
            Mode::Client => 3,
            Mode::Server => 4,
            Mode::Broadcast => 5,
            Mode::Control => 6,
            Mode::Private => 7,
            Mode::Unknown(bits) => bits & 0b111,
        }
    }

    /// Human-readable label
    pub fn description(&self) -> &'static str {
        match self {
            Mode::Reserved => "reserved",
            Mode::SymmetricActive => "symmetric active",
            Mode::SymmetricPassive => "symmetric passive",
            Mode::Client => "client",
            Mode::Server => "server",
            Mode::Broadcast => "broadcast",
            Mode::Control => "reserved for NTP control messages",
            Mode::Private => "reserved for private use",
            Mode::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Interpretation of the reference identifier word
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceId {
    /// Four-character code of a reference clock (stratum 0 and 1)
    Ascii(String),
    /// Address of the upstream server (stratum 2 and above)
    Ipv4(Ipv4Addr),
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceId::Ascii(code) => f.write_str(code),
            ReferenceId::Ipv4(addr) => write!(f, "{addr}"),
        }
    }
}

/// Splits the first header byte into leap indicator, version number and mode
pub fn split_header_byte(byte: u8) -> (LeapIndicator, u8, Mode) {
    (
        LeapIndicator::from_bits(byte >> 6),
        (byte >> 3) & 0b111,
        Mode::from_bits(byte & 0b111),
    )
}

/// Packs leap indicator, version number and mode into the first header byte
pub fn pack_header_byte(leap_indicator: LeapIndicator, version_number: u8, mode: Mode) -> u8 {
    (leap_indicator.bits() << 6) | ((version_number & 0b111) << 3) | mode.bits()
}

/// An NTP header as laid out on the wire.
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |LI | VN  |Mode |    Stratum    |     Poll      |   Precision   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          Root Delay                           |
/// |                       Root Dispersion                         |
/// |                     Reference Identifier                      |
/// |                Reference Timestamp (64 bits)                  |
/// |                Originate Timestamp (64 bits)                  |
/// |                 Receive Timestamp (64 bits)                   |
/// |                 Transmit Timestamp (64 bits)                  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NtpPacket {
    pub leap_indicator: LeapIndicator,
    pub version_number: u8,
    pub mode: Mode,
    pub stratum: u8,
    pub poll_interval: u8,
    /// Raw precision byte; see [`NtpPacket::precision_log2`]
    pub precision: u8,
    pub root_delay: u32,
    pub root_dispersion: u32,
    pub reference_identifier: u32,
    pub reference_timestamp: NtpTimestamp,
    /// t1 as echoed by the server
    pub originate_timestamp: NtpTimestamp,
    /// t2, when the request arrived at the server
    pub receive_timestamp: NtpTimestamp,
    /// t3, when the server sent its reply
    pub transmit_timestamp: NtpTimestamp,
}

impl NtpPacket {
    /// Builds a version 3 client request stamped with `local_time`.
    ///
    /// Originate and transmit both carry the send instant.
    pub fn client_request(local_time: DateTime<Utc>) -> Result<Self> {
        let sent = NtpTimestamp::from_datetime(local_time)?;
        Ok(NtpPacket {
            leap_indicator: LeapIndicator::Unsynchronized,
            version_number: PROTOCOL_VERSION,
            mode: Mode::Client,
            stratum: 0,
            poll_interval: 0,
            precision: 0,
            root_delay: 0,
            root_dispersion: 0,
            reference_identifier: 0,
            reference_timestamp: NtpTimestamp::ZERO,
            originate_timestamp: sent,
            receive_timestamp: NtpTimestamp::ZERO,
            transmit_timestamp: sent,
        })
    }

    /// The packed LI/VN/Mode byte
    pub fn header_byte(&self) -> u8 {
        pack_header_byte(self.leap_indicator, self.version_number, self.mode)
    }

    /// Writes the 48-byte big-endian layout
    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_u8(self.header_byte());
        dst.put_u8(self.stratum);
        dst.put_u8(self.poll_interval);
        dst.put_u8(self.precision);
        dst.put_u32(self.root_delay);
        dst.put_u32(self.root_dispersion);
        dst.put_u32(self.reference_identifier);
        self.reference_timestamp.write_to(dst);
        self.originate_timestamp.write_to(dst);
        self.receive_timestamp.write_to(dst);
        self.transmit_timestamp.write_to(dst);
    }

    /// Returns the encoded packet
    pub fn to_bytes(&self) -> [u8; PACKET_SIZE] {
        let mut bytes = [0u8; PACKET_SIZE];
        self.encode(&mut &mut bytes[..]);
        bytes
    }

    /// Parses exactly one 48-byte packet
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PACKET_SIZE {
            return Err(Error::format(format!(
                "expected {} byte NTP packet, got {} bytes",
                PACKET_SIZE,
                bytes.len()
            )));
        }

        let mut src = bytes;
        let (leap_indicator, version_number, mode) = split_header_byte(src.get_u8());

        Ok(NtpPacket {
            leap_indicator,
            version_number,
            mode,
            stratum: src.get_u8(),
            poll_interval: src.get_u8(),
            precision: src.get_u8(),
            root_delay: src.get_u32(),
            root_dispersion: src.get_u32(),
            reference_identifier: src.get_u32(),
            reference_timestamp: NtpTimestamp::read_from(&mut src),
            originate_timestamp: NtpTimestamp::read_from(&mut src),
            receive_timestamp: NtpTimestamp::read_from(&mut src),
            transmit_timestamp: NtpTimestamp::read_from(&mut src),
        })
    }

    /// Precision as a signed power of two (seconds).
    ///
    /// Reinterprets the raw byte; not checked against servers that fill the
    /// slot differently.
    pub fn precision_log2(&self) -> i8 {
        self.precision as i8
    }

    /// Root delay in seconds (signed 16.16 fixed point)
    pub fn root_delay_seconds(&self) -> f64 {
        f64::from(self.root_delay as i32) / 65_536.0
    }

    /// Root dispersion in seconds (unsigned 16.16 fixed point)
    pub fn root_dispersion_seconds(&self) -> f64 {
        f64::from(self.root_dispersion) / 65_536.0
    }

    /// Interprets the reference identifier according to the stratum
    pub fn reference_id(&self) -> ReferenceId {
        let bytes = self.reference_identifier.to_be_bytes();
        if self.stratum <= 1 {
            let code: String = bytes
                .iter()
                .take_while(|&&b| b != 0)
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
                .collect();
            ReferenceId::Ascii(code)
        } else {
            ReferenceId::Ipv4(Ipv4Addr::from(bytes))
        }
    }
}
