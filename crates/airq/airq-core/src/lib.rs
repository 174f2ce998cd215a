//! Air Quality Forecasting Core
//!
//! Implementations behind the `airq-spi` contracts: AQI conversion, the
//! regression forest, the recursive forecast engine, the realtime-database
//! source, the CSV results log and the run-level forecast service.

pub mod aqi;
pub mod clock;
pub mod engine;
pub mod ensemble;
pub mod evaluation;
pub mod history;
pub mod recorder;
pub mod seed;
pub mod service;
pub mod source;

// Re-export SPI types for implementations
pub use airq_spi::{
    Clock, EnsembleRegressor, ForecastParams, ForecastRecord, ForecastSink, ForestParams,
    LagWindow, ModelError, Observation, ObservationSource, PersistenceError, Result, RunError,
    SeedPolicy, SourceError, StepPrediction, FORECAST_HORIZON,
};

// Re-export main types
pub use aqi::{pm25_to_aqi, AqiCategory, MAX_AQI};
pub use clock::{FixedClock, SystemClock};
pub use engine::ForecastEngine;
pub use ensemble::{RandomForest, RegressionTree};
pub use evaluation::{train_and_evaluate, CrossValidation, ModelReport};
pub use history::LagDataset;
pub use recorder::{read_latest, read_records, CsvSink, DiscardSink, ResultRecorder};
pub use seed::run_rng;
pub use service::{ForecastService, ForecastSummary, RunOutcome};
pub use source::{latest_observation, ManualSource, RealtimeDbSource};
