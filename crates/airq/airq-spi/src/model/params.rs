//! Tuning parameters for the forecast engine and the tree ensemble.

use serde::{Deserialize, Serialize};

use super::FORECAST_HORIZON;
use crate::error::{ModelError, Result};

fn invalid(name: &str, reason: &str) -> ModelError {
    ModelError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Perturbation and clamping profile of the recursive forecast.
///
/// The defaults keep recursive forecasts from collapsing onto a flat line:
/// a daily-cycle distortion of the seeded 24h lag, then per step a cyclic
/// variation, a uniform environmental noise draw and a fixed step bias,
/// followed by a clamp around the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastParams {
    /// Ratio of the input used as the synthesized 24h lag
    pub lag_24h_ratio: f64,
    /// Amplitude of the daily cycle applied to the synthesized lag
    pub daily_cycle_amplitude: f64,
    /// Uniform jitter range `[low, high)` added to 1 for the synthesized lag;
    /// equal bounds disable the draw's effect
    pub seed_jitter: (f64, f64),
    /// Amplitude of the per-step cyclic variation
    pub step_cycle_amplitude: f64,
    /// Divisor of `step × π` in the per-step cyclic variation
    pub step_cycle_period: f64,
    /// Uniform environmental noise range `[low, high)`
    pub noise_range: (f64, f64),
    /// Fixed multiplicative bias per step index
    pub step_factors: [f64; FORECAST_HORIZON],
    /// Forecasts are clamped to `input × (1 ± clamp_fraction)`
    pub clamp_fraction: f64,
    /// Guard added to the mean in the confidence ratio
    pub epsilon: f64,
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self {
            lag_24h_ratio: 0.92,
            daily_cycle_amplitude: 0.04,
            seed_jitter: (-0.02, 0.03),
            step_cycle_amplitude: 0.03,
            step_cycle_period: 2.5,
            noise_range: (0.92, 1.08),
            step_factors: [1.05, 0.95, 1.10, 0.90, 1.03],
            clamp_fraction: 0.25,
            epsilon: 1e-8,
        }
    }
}

impl ForecastParams {
    /// Profile with every perturbation disabled (factors of exactly 1).
    ///
    /// Useful to observe the raw ensemble trajectory under the clamp.
    pub fn unperturbed() -> Self {
        Self {
            daily_cycle_amplitude: 0.0,
            seed_jitter: (0.0, 0.0),
            step_cycle_amplitude: 0.0,
            noise_range: (1.0, 1.0),
            step_factors: [1.0; FORECAST_HORIZON],
            ..Self::default()
        }
    }

    /// Check ranges so the engine can draw from them without panicking.
    pub fn validate(&self) -> Result<()> {
        if !(self.lag_24h_ratio.is_finite() && self.lag_24h_ratio >= 0.0) {
            return Err(invalid("lag_24h_ratio", "must be a non-negative number"));
        }
        if !self.daily_cycle_amplitude.is_finite() {
            return Err(invalid("daily_cycle_amplitude", "must be a finite number"));
        }
        if !self.step_cycle_amplitude.is_finite() {
            return Err(invalid("step_cycle_amplitude", "must be a finite number"));
        }
        if !self.seed_jitter.1.is_finite() {
            return Err(invalid("seed_jitter", "high must be finite"));
        }
        if !(self.seed_jitter.0 <= self.seed_jitter.1) || self.seed_jitter.0 <= -1.0 {
            return Err(invalid("seed_jitter", "low must be above -1 and not above high"));
        }
        if !self.noise_range.1.is_finite() {
            return Err(invalid("noise_range", "high must be finite"));
        }
        if !(self.noise_range.0 <= self.noise_range.1) || self.noise_range.0 < 0.0 {
            return Err(invalid("noise_range", "must be non-negative with low not above high"));
        }
        if !(self.step_cycle_period > 0.0 && self.step_cycle_period.is_finite()) {
            return Err(invalid("step_cycle_period", "must be a positive number"));
        }
        if !(0.0..=1.0).contains(&self.clamp_fraction) {
            return Err(invalid("clamp_fraction", "must be within [0, 1]"));
        }
        if self.step_factors.iter().any(|f| !f.is_finite() || *f < 0.0) {
            return Err(invalid("step_factors", "must be non-negative numbers"));
        }
        if !(self.epsilon > 0.0) {
            return Err(invalid("epsilon", "must be positive"));
        }
        Ok(())
    }
}

/// Hyperparameters of the bootstrap-aggregated regression forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Depth limit; `None` grows trees until leaves are pure or too small
    pub max_depth: Option<usize>,
    /// Minimum rows required to split a node
    pub min_samples_split: usize,
    /// Minimum rows in each child of a split
    pub min_samples_leaf: usize,
    /// Draw a bootstrap sample per tree
    pub bootstrap: bool,
    /// Base seed; tree `i` uses `seed + i`
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    /// Check hyperparameters before fitting.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators < 1 {
            return Err(invalid("n_estimators", "must be at least 1"));
        }
        if self.min_samples_split < 2 {
            return Err(invalid("min_samples_split", "must be at least 2"));
        }
        if self.min_samples_leaf < 1 {
            return Err(invalid("min_samples_leaf", "must be at least 1"));
        }
        if self.max_depth == Some(0) {
            return Err(invalid("max_depth", "must be at least 1 when set"));
        }
        Ok(())
    }
}

/// How each forecast run seeds its pseudo-random generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeedPolicy {
    /// Seed with the run clock's minute: reproducible within a minute, varied across minutes
    #[default]
    MinuteOfHour,
    /// Seed with a constant
    Fixed(u64),
}

impl std::str::FromStr for SeedPolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("minute") {
            return Ok(SeedPolicy::MinuteOfHour);
        }
        s.parse::<u64>()
            .map(SeedPolicy::Fixed)
            .map_err(|_| invalid("seed_policy", "expected 'minute' or an unsigned integer"))
    }
}

impl std::fmt::Display for SeedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedPolicy::MinuteOfHour => write!(f, "minute"),
            SeedPolicy::Fixed(seed) => write!(f, "{}", seed),
        }
    }
}
