//! PM2.5 to Air Quality Index conversion
//!
//! Piecewise-linear interpolation over the US EPA PM2.5 breakpoint table:
//!
//! | Concentration (µg/m³) | AQI     |
//! |-----------------------|---------|
//! | 0.0 – 12.0            | 0 – 50  |
//! | 12.1 – 35.4           | 51 – 100 |
//! | 35.5 – 55.4           | 101 – 150 |
//! | 55.5 – 150.4          | 151 – 200 |
//! | 150.5 – 250.4         | 201 – 300 |
//! | 250.5 – 500.4         | 301 – 500 |
//!
//! Bands are scanned in order and the first band whose upper bound is at or
//! above the concentration wins. A value in the seam between two bands
//! (12.05, 35.45, ...) therefore belongs to the upper band; interpolating below
//! that band's low breakpoint still rounds to its lowest AQI. Anything above
//! 500.4 saturates at 500.
//!
//! The interpolated index is rounded half to even, so an exact tie such as
//! 12.5 (at 3.0 µg/m³) gives 12, not 13.

use serde::{Deserialize, Serialize};

/// Highest AQI on the scale.
pub const MAX_AQI: u16 = 500;

/// One breakpoint band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AqiBand {
    /// Low concentration breakpoint
    pub c_lo: f64,
    /// High concentration breakpoint (inclusive)
    pub c_hi: f64,
    /// AQI at `c_lo`
    pub i_lo: u16,
    /// AQI at `c_hi`
    pub i_hi: u16,
}

impl AqiBand {
    const fn new(c_lo: f64, c_hi: f64, i_lo: u16, i_hi: u16) -> Self {
        Self {
            c_lo,
            c_hi,
            i_lo,
            i_hi,
        }
    }

    /// Unrounded AQI for a concentration inside (or just below) this band.
    pub fn interpolate(&self, pm25: f64) -> f64 {
        let slope = f64::from(self.i_hi - self.i_lo) / (self.c_hi - self.c_lo);
        slope * (pm25 - self.c_lo) + f64::from(self.i_lo)
    }
}

/// PM2.5 breakpoint table.
pub const PM25_BANDS: [AqiBand; 6] = [
    AqiBand::new(0.0, 12.0, 0, 50),
    AqiBand::new(12.1, 35.4, 51, 100),
    AqiBand::new(35.5, 55.4, 101, 150),
    AqiBand::new(55.5, 150.4, 151, 200),
    AqiBand::new(150.5, 250.4, 201, 300),
    AqiBand::new(250.5, 500.4, 301, 500),
];

/// Convert a PM2.5 concentration to an integer AQI in `[0, 500]`.
///
/// Negative and NaN concentrations map to 0.
///
/// # Example
///
/// ```rust
/// use airq_core::aqi::pm25_to_aqi;
///
/// assert_eq!(pm25_to_aqi(40.0), 112);
/// assert_eq!(pm25_to_aqi(600.0), 500);
/// ```
pub fn pm25_to_aqi(pm25: f64) -> u16 {
    if !(pm25 > 0.0) {
        return 0;
    }

    match PM25_BANDS.iter().find(|band| pm25 <= band.c_hi) {
        Some(band) => {
            round_half_even(band.interpolate(pm25)).clamp(0.0, f64::from(MAX_AQI)) as u16
        }
        None => MAX_AQI,
    }
}

/// Round to the nearest integer, ties to the even neighbour.
fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - x.signum()
    } else {
        rounded
    }
}

/// Health category of an AQI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// Category containing `aqi`.
    pub fn from_aqi(aqi: u16) -> Self {
        match aqi {
            0..=50 => AqiCategory::Good,
            51..=100 => AqiCategory::Moderate,
            101..=150 => AqiCategory::UnhealthyForSensitiveGroups,
            151..=200 => AqiCategory::Unhealthy,
            201..=300 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    /// Category for a raw concentration.
    pub fn from_pm25(pm25: f64) -> Self {
        Self::from_aqi(pm25_to_aqi(pm25))
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    /// Dashboard colour (hex).
    pub fn color(&self) -> &'static str {
        match self {
            AqiCategory::Good => "#10B981",
            AqiCategory::Moderate => "#F59E0B",
            AqiCategory::UnhealthyForSensitiveGroups => "#F97316",
            AqiCategory::Unhealthy => "#EF4444",
            AqiCategory::VeryUnhealthy => "#8B5CF6",
            AqiCategory::Hazardous => "#7C2D12",
        }
    }

    /// Health advisory text.
    pub fn description(&self) -> &'static str {
        match self {
            AqiCategory::Good => {
                "Air quality is satisfactory, and air pollution poses little or no risk."
            }
            AqiCategory::Moderate => {
                "Air quality is acceptable for most people. However, sensitive people may experience minor respiratory symptoms."
            }
            AqiCategory::UnhealthyForSensitiveGroups => {
                "Members of sensitive groups may experience health effects. The general public is less likely to be affected."
            }
            AqiCategory::Unhealthy => {
                "Some members of the general public may experience health effects; members of sensitive groups may experience more serious health effects."
            }
            AqiCategory::VeryUnhealthy => {
                "Health alert: The risk of health effects is increased for everyone."
            }
            AqiCategory::Hazardous => {
                "Health warning of emergency conditions: everyone is more likely to be affected."
            }
        }
    }
}

impl std::fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
