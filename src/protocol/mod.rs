//! Protocol implementation module
//!
//! This module defines the NTP packet layout, the leap indicator and mode
//! tables, and encoding/decoding of the 48-byte header.

pub mod codec;
pub mod message;

pub use self::codec::{decode_response, encode_request, NtpCodec};
pub use self::message::{
    pack_header_byte, split_header_byte, LeapIndicator, Mode, NtpPacket, ReferenceId,
};
