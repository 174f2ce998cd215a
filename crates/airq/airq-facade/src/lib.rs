//! Air Quality Forecasting Facade
//!
//! Single entry point for the forecasting stack: configuration and bootstrap
//! from `airq-api`, implementations from `airq-core`, contracts and models
//! from `airq-spi`.

// Re-export the consumer API
pub use airq_api::*;

// Re-export core modules for direct access
pub use airq_core::{
    aqi, clock, engine, ensemble, evaluation, history, recorder, seed, service, source,
};

// Re-export main implementation types
pub use airq_core::{
    latest_observation, pm25_to_aqi, read_latest, read_records, run_rng, train_and_evaluate,
    AqiCategory, CrossValidation, CsvSink, DiscardSink, FixedClock, ForecastEngine,
    ForecastService, ForecastSummary, LagDataset, ManualSource, ModelReport, RandomForest,
    RealtimeDbSource, RegressionTree, ResultRecorder, RunOutcome, SystemClock, MAX_AQI,
};

// Re-export SPI contracts and models
pub use airq_spi::{
    Clock, EnsembleRegressor, ForecastParams, ForecastRecord, ForecastSink, ForestParams,
    LagWindow, ModelError, Observation, ObservationSource, PersistenceError, Result, RunError,
    SeedPolicy, SourceError, StepPrediction, FORECAST_HORIZON, TIMESTAMP_FORMAT,
};
