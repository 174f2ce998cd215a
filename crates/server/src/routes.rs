//! API route handlers

use std::path::PathBuf;
use std::time::Instant;

use airq_facade::{read_latest, ForecastRecord, TIMESTAMP_FORMAT};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

pub const NO_DATA_MESSAGE: &str = "No prediction data available";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub results_path: PathBuf,
    pub started: Instant,
}

/// One hourly point of the latest forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionPoint {
    /// Epoch milliseconds of the forecast hour
    pub timestamp: i64,
    #[serde(rename = "predictedAQI")]
    pub predicted_aqi: u16,
    #[serde(rename = "predictedPM25")]
    pub predicted_pm25: f64,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<PredictionPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since start
    pub uptime: f64,
}

/// Local wall-clock time as epoch milliseconds.
fn epoch_millis(at: NaiveDateTime) -> i64 {
    Local
        .from_local_datetime(&at)
        .earliest()
        .map(|t| t.timestamp_millis())
        .unwrap_or_else(|| at.and_utc().timestamp_millis())
}

/// Expand a record into hourly points starting one hour after it was made.
pub fn expand_record(record: &ForecastRecord) -> Vec<PredictionPoint> {
    record
        .steps()
        .into_iter()
        .enumerate()
        .map(|(i, step)| PredictionPoint {
            timestamp: epoch_millis(record.timestamp + Duration::hours(i as i64 + 1)),
            predicted_aqi: step.aqi,
            predicted_pm25: step.pm25,
            confidence: step.confidence,
        })
        .collect()
}

/// Latest forecast from the results log.
pub async fn predictions(
    State(state): State<AppState>,
) -> Result<Json<PredictionsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let path = state.results_path.clone();
    let latest = tokio::task::spawn_blocking(move || read_latest(&path))
        .await
        .map_err(|e| internal(e.to_string()))?
        .map_err(|e| internal(e.to_string()))?;

    let response = match latest {
        Some(record) => PredictionsResponse {
            predictions: expand_record(&record),
            timestamp: Some(record.timestamp.format(TIMESTAMP_FORMAT).to_string()),
            message: None,
        },
        None => PredictionsResponse {
            predictions: Vec::new(),
            timestamp: None,
            message: Some(NO_DATA_MESSAGE.to_string()),
        },
    };

    Ok(Json(response))
}

fn internal(detail: String) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!(error = %detail, "Failed to read prediction data");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Failed to read prediction data".to_string(),
        }),
    )
}

/// Liveness probe.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        uptime: state.started.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use airq_facade::{CsvSink, ForecastSink, Observation, StepPrediction};
    use std::fs;
    use tempfile::TempDir;

    fn record() -> ForecastRecord {
        let ts = Observation::parse_timestamp("2024-01-15 10:00:00").unwrap();
        let steps = [
            StepPrediction::new(42.0, 117, 0.91),
            StepPrediction::new(38.5, 108, 0.88),
            StepPrediction::new(44.1, 122, 0.93),
            StepPrediction::new(37.2, 105, 0.86),
            StepPrediction::new(41.0, 114, 0.9),
        ];
        ForecastRecord::from_steps(ts, 40.0, &steps)
    }

    fn state(dir: &TempDir) -> AppState {
        AppState {
            results_path: dir.path().join("prediction_results.csv"),
            started: Instant::now(),
        }
    }

    #[test]
    fn test_expand_record_hourly() {
        let record = record();
        let points = expand_record(&record);

        assert_eq!(points.len(), 5);
        assert_eq!(points[0].timestamp - epoch_millis(record.timestamp), 3_600_000);
        for pair in points.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, 3_600_000);
        }
        assert_eq!(points[2].predicted_aqi, 122);
        assert_eq!(points[2].predicted_pm25, 44.1);
        assert_eq!(points[2].confidence, 0.93);
    }

    #[test]
    fn test_point_field_names() {
        let point = &expand_record(&record())[0];
        let value = serde_json::to_value(point).unwrap();
        assert!(value.get("predictedAQI").is_some());
        assert!(value.get("predictedPM25").is_some());
        assert!(value.get("confidence").is_some());
        assert!(value.get("timestamp").is_some());
    }

    #[tokio::test]
    async fn test_predictions_without_data() {
        let dir = TempDir::new().unwrap();
        let Json(response) = predictions(State(state(&dir))).await.unwrap();

        assert!(response.predictions.is_empty());
        assert_eq!(response.message.as_deref(), Some(NO_DATA_MESSAGE));
    }

    #[tokio::test]
    async fn test_predictions_from_latest_row() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        CsvSink::new(&state.results_path).append(&record()).unwrap();

        let Json(response) = predictions(State(state)).await.unwrap();

        assert_eq!(response.predictions.len(), 5);
        assert_eq!(response.timestamp.as_deref(), Some("2024-01-15 10:00:00"));
        assert_eq!(response.predictions[0].predicted_pm25, 42.0);
        assert!(response.message.is_none());
    }

    #[tokio::test]
    async fn test_predictions_corrupt_log() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        fs::write(
            &state.results_path,
            "timestamp,input_pm25,pm25_forecast,aqi_forecast,confidence\nbad,x,y,z,w\n",
        )
        .unwrap();

        let result = predictions(State(state)).await;
        assert!(matches!(result, Err((StatusCode::INTERNAL_SERVER_ERROR, _))));
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let Json(response) = health(State(state(&dir))).await;
        assert_eq!(response.status, "healthy");
        assert!(response.uptime >= 0.0);
    }
}
