//! Remote realtime-database observation source
//!
//! The sensor feed is a JSON object keyed by reading id:
//!
//! ```json
//! {
//!   "-Nx1": { "timestamp": "2024-01-01 10:00:00", "pm25": 38.2, "humidity": 61 },
//!   "-Nx2": { "timestamp": "2024-01-01 11:00:00", "pm25": 40.0 }
//! }
//! ```
//!
//! Only `timestamp` and `pm25` are read. Readings missing either field, with
//! an unparsable timestamp, or with a negative or non-numeric concentration
//! are skipped.

use std::time::Duration;

use airq_spi::{Observation, ObservationSource, SourceError};
use serde_json::Value;

#[cfg(feature = "fetch")]
use tracing::{debug, info};

/// Default reading table path.
pub const DEFAULT_PATH: &str = "/sensorLogs";
/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn reading_pm25(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Parse one reading entry.
pub fn parse_reading(entry: &Value) -> Option<Observation> {
    let timestamp = entry
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(Observation::parse_timestamp)?;
    let pm25 = entry.get("pm25").and_then(reading_pm25)?;

    Some(Observation::new(timestamp, pm25)).filter(Observation::is_usable)
}

/// Most recent usable reading in a feed payload.
///
/// `None` for `null`, an empty table, or a table with no usable entry. Ties
/// on timestamp keep the first entry in key order.
pub fn latest_observation(readings: &Value) -> Option<Observation> {
    let table = readings.as_object()?;

    table
        .values()
        .filter_map(parse_reading)
        .fold(None, |latest: Option<Observation>, obs| match latest {
            Some(current) if current.timestamp >= obs.timestamp => Some(current),
            _ => Some(obs),
        })
}

/// Number of entries in a feed payload.
pub fn count_readings(readings: &Value) -> usize {
    readings.as_object().map_or(0, |table| table.len())
}

/// Source that always yields one supplied reading.
///
/// Drives offline forecasts from a manually entered concentration.
#[derive(Debug, Clone, Copy)]
pub struct ManualSource {
    observation: Observation,
}

impl ManualSource {
    pub fn new(observation: Observation) -> Self {
        Self { observation }
    }
}

impl ObservationSource for ManualSource {
    fn name(&self) -> &str {
        "manual"
    }

    fn fetch_latest(&self) -> Result<Observation, SourceError> {
        Ok(self.observation)
    }
}

/// Client for a realtime-database REST endpoint.
#[derive(Debug, Clone)]
pub struct RealtimeDbSource {
    base_url: String,
    path: String,
    auth: Option<String>,
    timeout: Duration,
}

impl RealtimeDbSource {
    /// Create a client for `host`.
    ///
    /// A bare host is addressed over HTTPS; a value that already carries a
    /// scheme is used as-is.
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        let base_url = if host.contains("://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };

        Self {
            base_url,
            path: DEFAULT_PATH.to_string(),
            auth: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the reading table path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    /// Set the database secret sent as the `auth` query parameter.
    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint URL, without credentials.
    pub fn url(&self) -> String {
        format!("{}{}.json", self.base_url, self.path)
    }

    /// Fetch the whole reading table (blocking).
    #[cfg(feature = "fetch")]
    pub fn fetch_readings(&self) -> Result<Value, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        let mut request = client.get(self.url());
        if let Some(auth) = &self.auth {
            request = request.query(&[("auth", auth)]);
        }

        let response = request
            .send()
            .map_err(|e| SourceError::RequestFailed(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus(status.as_u16()));
        }

        let text = response
            .text()
            .map_err(|e| SourceError::RequestFailed(e.without_url().to_string()))?;

        serde_json::from_str(&text).map_err(|e| SourceError::ParseError(e.to_string()))
    }
}

#[cfg(feature = "fetch")]
impl ObservationSource for RealtimeDbSource {
    fn name(&self) -> &str {
        "realtime-db"
    }

    fn fetch_latest(&self) -> Result<Observation, SourceError> {
        let readings = self.fetch_readings()?;
        debug!(count = count_readings(&readings), "Fetched readings");

        let latest = latest_observation(&readings).ok_or(SourceError::NoUsableObservation)?;
        info!(
            pm25 = latest.pm25,
            timestamp = %latest.timestamp,
            "Fetched latest observation"
        );
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latest_picks_greatest_timestamp() {
        let readings = json!({
            "a": { "timestamp": "2024-01-01 11:00:00", "pm25": 41.0 },
            "b": { "timestamp": "2024-01-01 12:30:00", "pm25": 44.5, "humidity": 60 },
            "c": { "timestamp": "2024-01-01 09:00:00", "pm25": 30.0 }
        });

        let latest = latest_observation(&readings).unwrap();
        assert_eq!(latest.pm25, 44.5);
        assert_eq!(
            latest.timestamp,
            Observation::parse_timestamp("2024-01-01 12:30:00").unwrap()
        );
    }

    #[test]
    fn test_latest_skips_unusable_entries() {
        let readings = json!({
            "a": { "timestamp": "2024-01-01 10:00:00", "pm25": 20.0 },
            "b": { "timestamp": "not a time", "pm25": 99.0 },
            "c": { "pm25": 98.0 },
            "d": { "timestamp": "2024-01-02 10:00:00" },
            "e": { "timestamp": "2024-01-03 10:00:00", "pm25": "n/a" },
            "f": { "timestamp": "2024-01-04 10:00:00", "pm25": -5.0 },
            "g": "garbage"
        });

        let latest = latest_observation(&readings).unwrap();
        assert_eq!(latest.pm25, 20.0);
    }

    #[test]
    fn test_numeric_string_concentration() {
        let readings = json!({
            "a": { "timestamp": "2024-01-01 10:00:00", "pm25": " 33.5 " }
        });
        assert_eq!(latest_observation(&readings).unwrap().pm25, 33.5);
    }

    #[test]
    fn test_empty_or_null_payload() {
        assert!(latest_observation(&json!(null)).is_none());
        assert!(latest_observation(&json!({})).is_none());
        assert!(latest_observation(&json!([1, 2, 3])).is_none());
        assert!(latest_observation(&json!({
            "a": { "timestamp": "bad", "pm25": 1.0 }
        }))
        .is_none());
    }

    #[test]
    fn test_count_readings() {
        assert_eq!(count_readings(&json!(null)), 0);
        assert_eq!(count_readings(&json!({ "a": {}, "b": {} })), 2);
    }

    #[test]
    fn test_manual_source() {
        let ts = Observation::parse_timestamp("2024-01-01 10:00:00").unwrap();
        let source = ManualSource::new(Observation::new(ts, 18.0));
        assert_eq!(source.fetch_latest().unwrap().pm25, 18.0);
        assert_eq!(source.name(), "manual");
    }

    #[test]
    fn test_url_building() {
        let source = RealtimeDbSource::new("example-db.firebaseio.com");
        assert_eq!(source.url(), "https://example-db.firebaseio.com/sensorLogs.json");

        let source = RealtimeDbSource::new("http://localhost:9000/")
            .with_path("readings")
            .with_auth("secret");
        assert_eq!(source.url(), "http://localhost:9000/readings.json");
        assert!(!source.url().contains("secret"));
    }
}
