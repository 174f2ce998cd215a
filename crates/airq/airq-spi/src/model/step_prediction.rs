//! Per-step forecast output.

use serde::{Deserialize, Serialize};

/// One forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepPrediction {
    /// Forecast PM2.5 concentration, never negative
    pub pm25: f64,
    /// AQI derived from `pm25`
    pub aqi: u16,
    /// `1 - stddev / mean` across ensemble members; not clamped
    pub confidence: f64,
}

impl StepPrediction {
    /// Create a new step prediction.
    pub fn new(pm25: f64, aqi: u16, confidence: f64) -> Self {
        Self {
            pm25,
            aqi,
            confidence,
        }
    }
}
