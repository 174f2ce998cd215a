//! Persisted forecast record.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::StepPrediction;

/// Result of one forecast run, shaped for storage.
///
/// The three sequences are parallel: index `i` describes forecast step `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    /// When the run happened
    pub timestamp: NaiveDateTime,
    /// Observation that seeded the run
    pub input_pm25: f64,
    /// Forecast concentrations
    pub pm25_forecast: Vec<f64>,
    /// Forecast AQI values
    pub aqi_forecast: Vec<u16>,
    /// Per-step ensemble confidence
    pub confidence: Vec<f64>,
}

impl ForecastRecord {
    /// Build a record from the engine's step predictions.
    pub fn from_steps(timestamp: NaiveDateTime, input_pm25: f64, steps: &[StepPrediction]) -> Self {
        Self {
            timestamp,
            input_pm25,
            pm25_forecast: steps.iter().map(|s| s.pm25).collect(),
            aqi_forecast: steps.iter().map(|s| s.aqi).collect(),
            confidence: steps.iter().map(|s| s.confidence).collect(),
        }
    }

    /// Number of forecast steps.
    pub fn len(&self) -> usize {
        self.pm25_forecast.len()
    }

    /// Whether the record holds no steps.
    pub fn is_empty(&self) -> bool {
        self.pm25_forecast.is_empty()
    }

    /// The three sequences have equal length.
    pub fn is_consistent(&self) -> bool {
        self.pm25_forecast.len() == self.aqi_forecast.len()
            && self.pm25_forecast.len() == self.confidence.len()
    }

    /// Re-assemble the per-step view.
    pub fn steps(&self) -> Vec<StepPrediction> {
        self.pm25_forecast
            .iter()
            .zip(&self.aqi_forecast)
            .zip(&self.confidence)
            .map(|((&pm25, &aqi), &confidence)| StepPrediction::new(pm25, aqi, confidence))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Observation;

    fn sample_steps() -> Vec<StepPrediction> {
        vec![
            StepPrediction::new(42.0, 117, 0.91),
            StepPrediction::new(38.5, 108, 0.88),
            StepPrediction::new(44.1, 122, 0.93),
        ]
    }

    #[test]
    fn test_from_steps_splits_columns() {
        let ts = Observation::parse_timestamp("2024-01-01 10:00:00").unwrap();
        let record = ForecastRecord::from_steps(ts, 40.0, &sample_steps());

        assert_eq!(record.input_pm25, 40.0);
        assert_eq!(record.pm25_forecast, vec![42.0, 38.5, 44.1]);
        assert_eq!(record.aqi_forecast, vec![117, 108, 122]);
        assert_eq!(record.confidence, vec![0.91, 0.88, 0.93]);
        assert!(record.is_consistent());
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_steps_reassembles() {
        let ts = Observation::parse_timestamp("2024-01-01 10:00:00").unwrap();
        let steps = sample_steps();
        let record = ForecastRecord::from_steps(ts, 40.0, &steps);
        assert_eq!(record.steps(), steps);
    }

    #[test]
    fn test_inconsistent_record_detected() {
        let ts = Observation::parse_timestamp("2024-01-01 10:00:00").unwrap();
        let mut record = ForecastRecord::from_steps(ts, 40.0, &sample_steps());
        record.confidence.pop();
        assert!(!record.is_consistent());
    }
}
