//! Data models for observations, forecasts and tuning parameters.

mod forecast_record;
mod lag_window;
mod observation;
mod params;
mod step_prediction;

pub use forecast_record::ForecastRecord;
pub use lag_window::LagWindow;
pub use observation::{Observation, TIMESTAMP_FORMAT};
pub use params::{ForecastParams, ForestParams, SeedPolicy};
pub use step_prediction::StepPrediction;

/// Number of steps in every forecast run.
pub const FORECAST_HORIZON: usize = 5;
