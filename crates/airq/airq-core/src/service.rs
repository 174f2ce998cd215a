//! Forecast run boundary
//!
//! One run fetches the latest observation, forecasts from it and records the
//! result. Source and model failures abort the run with a [`RunError`]; a
//! persistence failure is logged and reported on the [`RunOutcome`].

use std::sync::Arc;

use airq_spi::{
    Clock, EnsembleRegressor, ForecastParams, ForecastRecord, ForecastSink, ObservationSource,
    PersistenceError, RunError, SeedPolicy,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::clock::SystemClock;
use crate::engine::ForecastEngine;
use crate::recorder::ResultRecorder;
use crate::seed::run_rng;

/// Aggregate view of one forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub average: f64,
    /// Average relative to the input, in percent (0 for a zero input)
    pub variation_pct: f64,
    pub min: f64,
    pub max: f64,
}

impl ForecastSummary {
    pub fn from_record(record: &ForecastRecord) -> Self {
        let values = &record.pm25_forecast;
        let average = values.iter().sum::<f64>() / values.len().max(1) as f64;
        let variation_pct = if record.input_pm25 > 0.0 {
            (average - record.input_pm25) / record.input_pm25 * 100.0
        } else {
            0.0
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            average,
            variation_pct,
            min,
            max,
        }
    }
}

/// Result of a run that produced a forecast.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub record: ForecastRecord,
    pub summary: ForecastSummary,
    /// Set when the sink rejected the record
    pub persistence_error: Option<PersistenceError>,
}

impl RunOutcome {
    pub fn is_persisted(&self) -> bool {
        self.persistence_error.is_none()
    }
}

/// Forecast service wired from its collaborators.
pub struct ForecastService {
    source: Arc<dyn ObservationSource>,
    ensemble: Arc<dyn EnsembleRegressor>,
    recorder: ResultRecorder,
    clock: Arc<dyn Clock>,
    params: ForecastParams,
    seed_policy: SeedPolicy,
}

impl ForecastService {
    /// Service on the system clock with default parameters.
    pub fn new(
        source: Arc<dyn ObservationSource>,
        ensemble: Arc<dyn EnsembleRegressor>,
        sink: Arc<dyn ForecastSink>,
    ) -> Self {
        Self {
            source,
            ensemble,
            recorder: ResultRecorder::new(sink),
            clock: Arc::new(SystemClock),
            params: ForecastParams::default(),
            seed_policy: SeedPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_params(mut self, params: ForecastParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_seed_policy(mut self, seed_policy: SeedPolicy) -> Self {
        self.seed_policy = seed_policy;
        self
    }

    pub fn params(&self) -> &ForecastParams {
        &self.params
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        self.seed_policy
    }

    /// Fetch the latest observation and forecast from it.
    pub fn run_once(&self) -> Result<RunOutcome, RunError> {
        let observation = self.source.fetch_latest().map_err(|e| {
            warn!(source = self.source.name(), error = %e, "Skipping run");
            RunError::from(e)
        })?;

        info!(
            source = self.source.name(),
            pm25 = observation.pm25,
            observed_at = %observation.timestamp,
            "Starting forecast run"
        );

        self.run_from(observation.pm25)
    }

    /// Forecast from a supplied concentration without touching the source.
    pub fn run_from(&self, latest_pm25: f64) -> Result<RunOutcome, RunError> {
        let at = self.clock.now();
        let mut rng = run_rng(self.seed_policy, at);

        let engine = ForecastEngine::new(self.ensemble.as_ref(), &self.params);
        let steps = engine.forecast(latest_pm25, at, &mut rng).map_err(|e| {
            warn!(error = %e, "Forecast aborted");
            RunError::from(e)
        })?;

        let (record, persisted) = self.recorder.record(at, latest_pm25, &steps);
        let summary = ForecastSummary::from_record(&record);

        info!(
            input = latest_pm25,
            pm25 = ?record.pm25_forecast,
            aqi = ?record.aqi_forecast,
            confidence = ?record.confidence,
            average = summary.average,
            variation_pct = summary.variation_pct,
            min = summary.min,
            max = summary.max,
            "Forecast complete"
        );

        Ok(RunOutcome {
            record,
            summary,
            persistence_error: persisted.err(),
        })
    }
}
