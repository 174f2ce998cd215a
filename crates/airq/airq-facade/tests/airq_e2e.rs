//! End-to-end tests: history file to recorded forecast
//!
//! Trains from a CSV history, saves and reloads the model, forecasts through
//! the configured service and reads the results log back.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use airq_facade::{
    build_service, pm25_to_aqi, prepare_forest, read_latest, read_records, results_sink,
    AppConfig, AppConfigBuilder, AqiCategory, FixedClock, ManualSource, ModelOrigin,
    Observation, SeedPolicy, FORECAST_HORIZON,
};
use tempfile::TempDir;

fn write_history(dir: &TempDir) -> PathBuf {
    let mut content = String::from("timestamp,pm2_5,pm2_5_lag_1h,pm2_5_lag_24h\n");
    let mut previous = 30.0;
    for hour in 0..96 {
        let level = 30.0 + 12.0 * ((hour as f64) * std::f64::consts::PI / 12.0).sin();
        writeln!(
            content,
            "2024-01-{:02} {:02}:00:00,{:.2},{:.2},{:.2}",
            1 + hour / 24,
            hour % 24,
            level,
            previous,
            level * 0.92
        )
        .unwrap();
        previous = level;
    }
    let path = dir.path().join("history.csv");
    fs::write(&path, content).unwrap();
    path
}

fn config(dir: &TempDir) -> AppConfig {
    AppConfigBuilder::new()
        .history_path(write_history(dir))
        .model_path(dir.path().join("forest.json"))
        .results_path(dir.path().join("prediction_results.csv"))
        .n_estimators(15)
        .build()
        .unwrap()
}

fn run(config: &AppConfig, pm25: f64, now: &str) -> airq_facade::RunOutcome {
    let (forest, _) = prepare_forest(config).unwrap();
    let at = Observation::parse_timestamp(now).unwrap();

    build_service(
        config,
        Arc::new(ManualSource::new(Observation::new(at, pm25))),
        Arc::new(forest),
        Arc::new(results_sink(config)),
    )
    .with_clock(Arc::new(FixedClock(at)))
    .run_once()
    .unwrap()
}

#[test]
fn e2e_train_forecast_and_record() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let outcome = run(&config, 38.0, "2024-01-05 14:00:00");
    assert!(outcome.is_persisted());

    let latest = read_latest(&config.results_path).unwrap().unwrap();
    assert_eq!(latest.input_pm25, 38.0);
    assert_eq!(latest.len(), FORECAST_HORIZON);
    assert_eq!(latest.aqi_forecast, outcome.record.aqi_forecast);

    for (stored, exact) in latest.pm25_forecast.iter().zip(&outcome.record.pm25_forecast) {
        assert!((stored - exact).abs() <= 0.005 + 1e-9);
        assert!(*stored >= 28.5 - 0.005 && *stored <= 47.5 + 0.005);
    }
    for (stored, exact) in latest.confidence.iter().zip(&outcome.record.confidence) {
        assert!((stored - exact).abs() <= 0.0005 + 1e-9);
    }
    for (pm25, aqi) in outcome.record.pm25_forecast.iter().zip(&outcome.record.aqi_forecast) {
        assert_eq!(*aqi, pm25_to_aqi(*pm25));
    }
}

#[test]
fn e2e_second_run_reuses_saved_model_and_appends() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let first = run(&config, 38.0, "2024-01-05 14:00:00");
    let (_, origin) = prepare_forest(&config).unwrap();
    assert!(matches!(origin, ModelOrigin::Loaded(_)));

    let second = run(&config, 52.0, "2024-01-05 15:00:00");

    let records = read_records(&config.results_path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].aqi_forecast, first.record.aqi_forecast);
    assert_eq!(records[1].aqi_forecast, second.record.aqi_forecast);

    let content = fs::read_to_string(&config.results_path).unwrap();
    assert_eq!(content.matches("timestamp,input_pm25").count(), 1);
}

#[test]
fn e2e_loaded_model_reproduces_trained_forecast() {
    let dir = TempDir::new().unwrap();
    let config = AppConfigBuilder::from(config(&dir))
        .seed_policy(SeedPolicy::Fixed(4))
        .build()
        .unwrap();

    let trained = run(&config, 44.0, "2024-01-05 09:13:00");
    let loaded = run(&config, 44.0, "2024-01-05 09:13:00");

    assert_eq!(trained.record.pm25_forecast, loaded.record.pm25_forecast);
}

#[test]
fn e2e_forecast_categories() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let outcome = run(&config, 40.0, "2024-01-05 20:00:00");
    for aqi in outcome.record.aqi_forecast {
        let category = AqiCategory::from_aqi(aqi);
        assert!(matches!(
            category,
            AqiCategory::Moderate | AqiCategory::UnhealthyForSensitiveGroups
        ));
    }
}
