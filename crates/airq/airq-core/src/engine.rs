//! Recursive multi-step forecast engine
//!
//! Turns the one-step ensemble into a [`FORECAST_HORIZON`]-step forecast.
//! Each step queries every member on the current [`LagWindow`], scores the
//! cross-member spread as a confidence, perturbs the ensemble mean (step
//! cycle, environmental noise, fixed per-step bias, in that order), clamps it
//! to a band around the seeding observation and feeds it back as the next
//! one-hour lag.
//!
//! The 24-hour lag is not observed at run time. The first window carries a
//! proxy derived from the latest reading, a daily cycle on the clock hour and
//! a small random jitter.

use std::f64::consts::PI;

use airq_spi::{
    EnsembleRegressor, ForecastParams, LagWindow, ModelError, Result, StepPrediction,
    FORECAST_HORIZON,
};
use chrono::{NaiveDateTime, Timelike};
use rand::Rng;
use tracing::debug;

use crate::aqi::pm25_to_aqi;

/// Uniform draw over `[lo, hi)`; a collapsed range yields `lo`.
fn draw<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    if lo < hi {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

/// Mean and population standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Forecast engine over a shared, read-only ensemble.
pub struct ForecastEngine<'a> {
    ensemble: &'a dyn EnsembleRegressor,
    params: &'a ForecastParams,
}

impl<'a> ForecastEngine<'a> {
    pub fn new(ensemble: &'a dyn EnsembleRegressor, params: &'a ForecastParams) -> Self {
        Self { ensemble, params }
    }

    /// First lag window: the latest reading and a 24-hour proxy.
    ///
    /// Consumes exactly one draw from `rng`.
    pub fn seed_window<R: Rng + ?Sized>(
        &self,
        latest_pm25: f64,
        at: NaiveDateTime,
        rng: &mut R,
    ) -> LagWindow {
        let p = self.params;
        let hour = f64::from(at.hour());
        let time_factor = 1.0 + p.daily_cycle_amplitude * (hour * PI / 12.0).sin();
        let random_factor = 1.0 + draw(rng, p.seed_jitter);
        let lag_24h = (latest_pm25 * p.lag_24h_ratio * time_factor * random_factor).max(0.0);

        LagWindow::new(latest_pm25, lag_24h)
    }

    /// Confidence from member agreement: `1 - std / (mean + ε)`, unclamped.
    pub fn confidence(&self, mean: f64, std: f64) -> f64 {
        1.0 - std / (mean + self.params.epsilon)
    }

    /// Forecast the next [`FORECAST_HORIZON`] steps from `latest_pm25`.
    ///
    /// `at` supplies the clock hour of the daily cycle. Any failure aborts the
    /// whole forecast.
    pub fn forecast<R: Rng + ?Sized>(
        &self,
        latest_pm25: f64,
        at: NaiveDateTime,
        rng: &mut R,
    ) -> Result<Vec<StepPrediction>> {
        if !(latest_pm25.is_finite() && latest_pm25 >= 0.0) {
            return Err(ModelError::InvalidFeatures(format!(
                "latest PM2.5 must be a non-negative number, got {}",
                latest_pm25
            )));
        }
        self.params.validate()?;
        if self.ensemble.n_members() == 0 {
            return Err(ModelError::NoMembers);
        }

        let p = self.params;
        let lower = latest_pm25 * (1.0 - p.clamp_fraction);
        let upper = latest_pm25 * (1.0 + p.clamp_fraction);

        let mut window = self.seed_window(latest_pm25, at, rng);
        let mut steps = Vec::with_capacity(FORECAST_HORIZON);

        for (s, step_factor) in p.step_factors.iter().enumerate() {
            let predictions = self.ensemble.member_predictions(&window)?;
            if predictions.is_empty() {
                return Err(ModelError::NoMembers);
            }
            if let Some(member) = predictions.iter().position(|v| !v.is_finite()) {
                return Err(ModelError::NonFinitePrediction { member });
            }

            let (raw, std) = mean_std(&predictions);
            let confidence = self.confidence(raw, std);

            let time_variation =
                1.0 + p.step_cycle_amplitude * (s as f64 * PI / p.step_cycle_period).sin();
            let noise = draw(rng, p.noise_range);
            let adjusted = (raw * time_variation * noise * step_factor)
                .clamp(lower, upper)
                .max(0.0);

            let aqi = pm25_to_aqi(adjusted);
            debug!(
                step = s + 1,
                lag_1h = window.lag_1h,
                lag_24h = window.lag_24h,
                raw,
                pm25 = adjusted,
                aqi,
                confidence,
                "Forecast step"
            );

            steps.push(StepPrediction::new(adjusted, aqi, confidence));
            window.advance(adjusted);
        }

        Ok(steps)
    }
}
