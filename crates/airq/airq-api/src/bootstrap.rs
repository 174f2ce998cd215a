//! Model preparation and service wiring.

use std::path::PathBuf;
use std::sync::Arc;

use airq_core::evaluation::{
    train_and_evaluate, ModelReport, DEFAULT_CV_FOLDS, DEFAULT_TEST_FRACTION,
};
use airq_core::{CsvSink, ForecastService, LagDataset, RandomForest};
use airq_spi::{EnsembleRegressor, ForecastSink, ObservationSource};
use tracing::info;

use crate::config::{AppConfig, ENV_HISTORY_PATH};
use crate::error::{BootstrapError, ConfigError};

#[cfg(feature = "fetch")]
use airq_core::RealtimeDbSource;

/// Where the forest came from.
#[derive(Debug, Clone)]
pub enum ModelOrigin {
    /// Read from a saved artifact
    Loaded(PathBuf),
    /// Fitted from history at startup
    Trained(Box<ModelReport>),
}

/// Fit a forest from the configured history and save it when a model path is set.
pub fn train_forest(config: &AppConfig) -> Result<(RandomForest, ModelReport), BootstrapError> {
    let history = config
        .history_path
        .as_ref()
        .ok_or(ConfigError::Missing(ENV_HISTORY_PATH))?;

    let dataset = LagDataset::from_csv(history)?;
    info!(
        path = %history.display(),
        samples = dataset.len(),
        "Loaded training history"
    );

    let (forest, report) = train_and_evaluate(
        &dataset,
        &config.forest,
        DEFAULT_TEST_FRACTION,
        DEFAULT_CV_FOLDS,
    )?;

    if let Some(path) = &config.model_path {
        forest.save(path)?;
        info!(path = %path.display(), "Saved model");
    }

    Ok((forest, report))
}

/// Load the saved forest if present, otherwise train one.
pub fn prepare_forest(config: &AppConfig) -> Result<(RandomForest, ModelOrigin), BootstrapError> {
    if let Some(path) = config.model_path.as_ref().filter(|p| p.exists()) {
        let forest = RandomForest::load(path)?;
        info!(
            path = %path.display(),
            trees = forest.trees().len(),
            "Loaded model"
        );
        return Ok((forest, ModelOrigin::Loaded(path.clone())));
    }

    if config.history_path.is_none() {
        return Err(ConfigError::Missing("AIRQ_MODEL_PATH or AIRQ_HISTORY_PATH").into());
    }

    let (forest, report) = train_forest(config)?;
    Ok((forest, ModelOrigin::Trained(Box::new(report))))
}

/// CSV results log at the configured path.
pub fn results_sink(config: &AppConfig) -> CsvSink {
    CsvSink::new(config.results_path.clone())
}

/// Wire a service from explicit collaborators and the configured parameters.
pub fn build_service(
    config: &AppConfig,
    source: Arc<dyn ObservationSource>,
    ensemble: Arc<dyn EnsembleRegressor>,
    sink: Arc<dyn ForecastSink>,
) -> ForecastService {
    ForecastService::new(source, ensemble, sink)
        .with_params(config.forecast.clone())
        .with_seed_policy(config.seed_policy)
}

/// Client for the configured reading table.
#[cfg(feature = "fetch")]
pub fn remote_source(config: &AppConfig) -> Result<RealtimeDbSource, ConfigError> {
    let mut source = RealtimeDbSource::new(config.require_source_host()?)
        .with_path(config.source.path.clone())
        .with_timeout(config.source.timeout);
    if let Some(auth) = &config.source.auth {
        source = source.with_auth(auth.clone());
    }
    Ok(source)
}

/// Service reading from the remote table and appending to the CSV log.
#[cfg(feature = "fetch")]
pub fn build_remote_service(
    config: &AppConfig,
    ensemble: Arc<dyn EnsembleRegressor>,
) -> Result<ForecastService, ConfigError> {
    let source = remote_source(config)?;
    Ok(build_service(
        config,
        Arc::new(source),
        ensemble,
        Arc::new(results_sink(config)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfigBuilder;
    use airq_core::{read_latest, FixedClock, ManualSource};
    use airq_spi::{Observation, SeedPolicy, FORECAST_HORIZON};
    use std::fmt::Write as _;
    use std::fs;
    use tempfile::TempDir;

    fn write_history(dir: &TempDir, rows: usize) -> PathBuf {
        let mut content = String::from("pm2_5,pm2_5_lag_1h,pm2_5_lag_24h\n");
        for i in 0..rows {
            let level = 20.0 + (i % 12) as f64 * 1.5;
            writeln!(content, "{},{},{}", level, level - 0.5, level * 0.9).unwrap();
        }
        let path = dir.path().join("history.csv");
        fs::write(&path, content).unwrap();
        path
    }

    fn config(dir: &TempDir) -> AppConfig {
        AppConfigBuilder::new()
            .history_path(write_history(dir, 60))
            .model_path(dir.path().join("model.json"))
            .results_path(dir.path().join("results.csv"))
            .n_estimators(8)
            .build()
            .unwrap()
    }

    #[test]
    fn test_prepare_trains_then_loads() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        let (trained, origin) = prepare_forest(&config).unwrap();
        assert!(matches!(origin, ModelOrigin::Trained(_)));
        assert!(dir.path().join("model.json").exists());

        let (loaded, origin) = prepare_forest(&config).unwrap();
        assert!(matches!(origin, ModelOrigin::Loaded(_)));
        assert_eq!(trained, loaded);
    }

    #[test]
    fn test_train_reports_metrics() {
        let dir = TempDir::new().unwrap();
        let (forest, report) = train_forest(&config(&dir)).unwrap();

        assert_eq!(forest.trees().len(), 8);
        assert_eq!(report.n_train + report.n_test, 59);
        assert_eq!(report.cross_validation.folds, 5);
    }

    #[test]
    fn test_prepare_without_model_or_history() {
        let config = AppConfig::default();
        assert!(matches!(
            prepare_forest(&config),
            Err(BootstrapError::Config(ConfigError::Missing(_)))
        ));
    }

    #[test]
    fn test_train_with_missing_history_file() {
        let config = AppConfigBuilder::new()
            .history_path("/nonexistent/history.csv")
            .build()
            .unwrap();
        assert!(matches!(train_forest(&config), Err(BootstrapError::Model(_))));
    }

    #[test]
    fn test_build_service_runs_and_records() {
        let dir = TempDir::new().unwrap();
        let config = AppConfigBuilder::from(config(&dir))
            .seed_policy(SeedPolicy::Fixed(11))
            .build()
            .unwrap();
        let (forest, _) = prepare_forest(&config).unwrap();

        let at = Observation::parse_timestamp("2024-02-01 08:00:00").unwrap();
        let service = build_service(
            &config,
            Arc::new(ManualSource::new(Observation::new(at, 30.0))),
            Arc::new(forest),
            Arc::new(results_sink(&config)),
        )
        .with_clock(Arc::new(FixedClock(at)));

        let outcome = service.run_once().unwrap();
        assert!(outcome.is_persisted());
        assert_eq!(outcome.record.len(), FORECAST_HORIZON);

        let latest = read_latest(&config.results_path).unwrap().unwrap();
        assert_eq!(latest.timestamp, at);
        assert_eq!(latest.aqi_forecast, outcome.record.aqi_forecast);
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn test_remote_source_requires_host() {
        let config = AppConfig::default();
        assert!(matches!(
            remote_source(&config),
            Err(ConfigError::Missing(_))
        ));

        let config = AppConfigBuilder::new()
            .source_host("db.example.com")
            .source_path("/readings")
            .build()
            .unwrap();
        let source = remote_source(&config).unwrap();
        assert_eq!(source.url(), "https://db.example.com/readings.json");
    }
}
