//! Time representation and conversion module
//!
//! Host instants are `chrono::DateTime<Utc>`. This module converts them to and
//! from the 64-bit NTP timestamp format and provides the clock abstraction the
//! query uses to capture its local send and receive instants.
//!
//! # Examples
//!
//! ```
//! use chrono::Utc;
//! use ntp_query::time::NtpTimestamp;
//!
//! let now = Utc::now();
//! let ts = NtpTimestamp::from_datetime(now).unwrap();
//! assert_eq!(ts.to_datetime(), now);
//! ```

mod timestamp;

pub use self::timestamp::NtpTimestamp;

use chrono::{DateTime, Utc};

/// Source of "now" for a query
pub trait Clock: Send + Sync {
    /// Returns the current host instant
    fn now(&self) -> DateTime<Utc>;
}

/// The host's wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Utility functions for time arithmetic
pub mod util {
    use chrono::{DateTime, Utc};

    /// Signed seconds from `earlier` to `later`.
    ///
    /// Whole seconds and nanoseconds are subtracted as integers before the
    /// conversion to float, so nearby instants keep full precision.
    pub fn seconds_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
        let secs = later.timestamp() - earlier.timestamp();
        let nanos = i64::from(later.timestamp_subsec_nanos())
            - i64::from(earlier.timestamp_subsec_nanos());
        secs as f64 + nanos as f64 / 1e9
    }
}
