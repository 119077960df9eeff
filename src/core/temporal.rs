//! Timestamps carried by log records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Point in time as fractional seconds since the Unix epoch
///
/// Log decoders report wall-clock time as a float, so ordering is the
/// partial order of `f64`. A NaN timestamp compares neither before nor
/// after any window.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since Unix epoch
    secs: f64,
}

impl Timestamp {
    /// The epoch, used when a record carries no timestamp
    pub const ZERO: Timestamp = Timestamp { secs: 0.0 };

    /// Earliest representable time
    pub const MIN: Timestamp = Timestamp {
        secs: f64::NEG_INFINITY,
    };

    /// Latest representable time
    pub const MAX: Timestamp = Timestamp {
        secs: f64::INFINITY,
    };

    /// Create a timestamp from fractional seconds since Unix epoch
    pub fn from_secs_f64(secs: f64) -> Self {
        Self { secs }
    }

    /// Create a timestamp from whole seconds since Unix epoch
    pub fn from_secs(secs: i64) -> Self {
        Self { secs: secs as f64 }
    }

    /// Get fractional seconds since Unix epoch
    pub fn as_secs_f64(&self) -> f64 {
        self.secs
    }

    /// Convert to chrono DateTime, `None` when out of chrono's range
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if !self.secs.is_finite() {
            return None;
        }
        let whole = self.secs.floor();
        let nanos = ((self.secs - whole) * 1_000_000_000.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}", self.secs),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            secs: dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_creation() {
        assert_eq!(Timestamp::from_secs(1000).as_secs_f64(), 1000.0);
        assert_eq!(Timestamp::default(), Timestamp::ZERO);
    }

    #[test]
    fn test_timestamp_ordering() {
        let early = Timestamp::from_secs_f64(1_700_000_000.25);
        let late = Timestamp::from_secs_f64(1_700_000_001.0);
        assert!(early < late);
        assert!(Timestamp::MIN < early);
        assert!(late < Timestamp::MAX);

        let nan = Timestamp::from_secs_f64(f64::NAN);
        assert!(!(nan < early) && !(nan > early));
    }

    #[test]
    fn test_timestamp_display() {
        let ts = Timestamp::from_secs(1_000_000_000);
        assert_eq!(ts.to_string(), "2001-09-09T01:46:40+00:00");
        assert_eq!(Timestamp::MAX.to_string(), "inf");
    }

    #[test]
    fn test_datetime_roundtrip() {
        let ts = Timestamp::from_secs_f64(1_600_000_000.5);
        let dt = ts.to_datetime().unwrap();
        assert_eq!(Timestamp::from(dt), ts);
    }
}
