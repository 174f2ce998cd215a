//! Observed PM2.5 readings.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout used by the sensor feed and the results log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single PM2.5 concentration reading (µg/m³).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// When the sensor took the reading
    pub timestamp: NaiveDateTime,
    /// Fine particulate concentration
    pub pm25: f64,
}

impl Observation {
    /// Create a new observation.
    pub fn new(timestamp: NaiveDateTime, pm25: f64) -> Self {
        Self { timestamp, pm25 }
    }

    /// Parse a feed timestamp (`YYYY-MM-DD HH:MM:SS`).
    pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
    }

    /// Whether the concentration can seed a forecast.
    pub fn is_usable(&self) -> bool {
        self.pm25.is_finite() && self.pm25 >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_parse_timestamp() {
        let ts = Observation::parse_timestamp("2024-03-05 14:07:09").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(ts.hour(), 14);
        assert_eq!(ts.minute(), 7);
    }

    #[test]
    fn test_parse_timestamp_rejects_other_layouts() {
        assert!(Observation::parse_timestamp("2024-03-05T14:07:09").is_none());
        assert!(Observation::parse_timestamp("05/03/2024 14:07").is_none());
        assert!(Observation::parse_timestamp("").is_none());
    }

    #[test]
    fn test_is_usable() {
        let ts = Observation::parse_timestamp("2024-03-05 14:07:09").unwrap();
        assert!(Observation::new(ts, 0.0).is_usable());
        assert!(Observation::new(ts, 40.0).is_usable());
        assert!(!Observation::new(ts, -1.0).is_usable());
        assert!(!Observation::new(ts, f64::NAN).is_usable());
    }
}
