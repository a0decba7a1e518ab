use bytes::{Buf, BufMut};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::time::UNIX_EPOCH;

use crate::core::{Error, Result, EPOCH_DELTA};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// **NTP Timestamp Format** - 32-bit unsigned seconds since 1900-01-01T00:00:00Z
/// followed by a 32-bit binary fraction of a second (one unit is 2^-32 s, about
/// 233 picoseconds).
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Seconds                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Fraction                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Only era 0 is supported: instants before 1900 or from 2036-02-07T06:28:16Z
/// onwards are rejected with [`Error::Range`] instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NtpTimestamp {
    /// Seconds since the NTP epoch
    pub seconds: u32,
    /// Fraction of a second in units of 2^-32 s
    pub fraction: u32,
}

impl NtpTimestamp {
    /// The all-zero timestamp servers use for "not set"
    pub const ZERO: Self = NtpTimestamp {
        seconds: 0,
        fraction: 0,
    };

    /// Creates a timestamp from its raw wire halves
    pub const fn new(seconds: u32, fraction: u32) -> Self {
        NtpTimestamp { seconds, fraction }
    }

    /// Encodes a host instant.
    ///
    /// The fraction is floored, so the result never lies after `time`.
    pub fn from_datetime(time: DateTime<Utc>) -> Result<Self> {
        let seconds = time.timestamp() + EPOCH_DELTA;
        let seconds = u32::try_from(seconds).map_err(|_| {
            Error::range(format!(
                "{} is outside the NTP era 0 range [1900-01-01, 2036-02-07)",
                time.to_rfc3339()
            ))
        })?;

        // chrono reports a leap second as nanos >= 1e9
        let nanos = u64::from(time.timestamp_subsec_nanos()).min(NANOS_PER_SEC - 1);
        let fraction = ((nanos << 32) / NANOS_PER_SEC) as u32;

        Ok(NtpTimestamp { seconds, fraction })
    }

    /// Decodes to a host instant, rounding the fraction to the nearest nanosecond.
    ///
    /// The zero timestamp is not special: it decodes to 1900-01-01T00:00:00Z.
    pub fn to_datetime(self) -> DateTime<Utc> {
        let secs = i64::from(self.seconds) - EPOCH_DELTA;
        let nanos = (u64::from(self.fraction) * NANOS_PER_SEC + (1 << 31)) >> 32;

        DateTime::<Utc>::from(UNIX_EPOCH)
            + TimeDelta::seconds(secs)
            + TimeDelta::nanoseconds(nanos as i64)
    }

    /// Returns true for the all-zero timestamp
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Seconds since the NTP epoch as a float
    pub fn as_seconds_f64(&self) -> f64 {
        f64::from(self.seconds) + f64::from(self.fraction) / 4_294_967_296.0
    }

    /// The 64-bit fixed-point word: seconds in the high half
    pub fn as_u64(&self) -> u64 {
        (u64::from(self.seconds) << 32) | u64::from(self.fraction)
    }

    /// Splits a 64-bit fixed-point word
    pub fn from_u64(fixed: u64) -> Self {
        NtpTimestamp {
            seconds: (fixed >> 32) as u32,
            fraction: fixed as u32,
        }
    }

    /// Writes the two big-endian words
    pub fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32(self.seconds);
        dst.put_u32(self.fraction);
    }

    /// Reads two big-endian words. The caller guarantees 8 bytes remain.
    pub fn read_from<B: Buf>(src: &mut B) -> Self {
        let seconds = src.get_u32();
        let fraction = src.get_u32();
        NtpTimestamp { seconds, fraction }
    }
}

impl TryFrom<DateTime<Utc>> for NtpTimestamp {
    type Error = Error;

    fn try_from(time: DateTime<Utc>) -> Result<Self> {
        NtpTimestamp::from_datetime(time)
    }
}

impl From<NtpTimestamp> for DateTime<Utc> {
    fn from(timestamp: NtpTimestamp) -> Self {
        timestamp.to_datetime()
    }
}
