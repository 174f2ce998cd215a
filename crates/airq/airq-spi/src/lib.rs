//! Air Quality Forecasting Service Provider Interface
//!
//! Defines the data model of a forecast run, the collaborator traits the
//! forecast service is wired from, and the error taxonomy of a run:
//!
//! - [`ObservationSource`]: supplies the latest PM2.5 reading
//! - [`EnsembleRegressor`]: per-member predictions over a [`LagWindow`]
//! - [`ForecastSink`]: durable append of a [`ForecastRecord`]
//! - [`Clock`]: the run instant
//! - [`RunError`]: why a run produced nothing

pub mod contract;
pub mod error;
pub mod model;

// Re-export all public items at crate root for convenience
pub use contract::{Clock, EnsembleRegressor, ForecastSink, ObservationSource};
pub use error::{ModelError, PersistenceError, Result, RunError, SourceError};
pub use model::{
    ForecastParams, ForecastRecord, ForestParams, LagWindow, Observation, SeedPolicy,
    StepPrediction, FORECAST_HORIZON, TIMESTAMP_FORMAT,
};
