//! Result recorder and CSV results log
//!
//! The recorder shapes engine output into a [`ForecastRecord`] and hands it
//! to a [`ForecastSink`]. A sink failure is logged and returned alongside the
//! record; the forecast itself is never lost.
//!
//! [`CsvSink`] appends one row per record:
//!
//! ```text
//! timestamp,input_pm25,pm25_forecast,aqi_forecast,confidence
//! 2024-01-01 10:00:00,40,"[42.13,38.5,44.1,37.2,41.0]","[117,108,122,105,114]","[0.912,0.9,0.93,0.88,0.91]"
//! ```

use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use airq_spi::{
    ForecastRecord, ForecastSink, Observation, PersistenceError, StepPrediction, TIMESTAMP_FORMAT,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default results log file name.
pub const DEFAULT_RESULTS_FILE: &str = "prediction_results.csv";

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Shapes forecasts into records and persists them.
#[derive(Clone)]
pub struct ResultRecorder {
    sink: Arc<dyn ForecastSink>,
}

impl ResultRecorder {
    pub fn new(sink: Arc<dyn ForecastSink>) -> Self {
        Self { sink }
    }

    /// Name of the underlying sink.
    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Build the record and append it.
    ///
    /// The record is returned even when the append fails.
    pub fn record(
        &self,
        timestamp: NaiveDateTime,
        input_pm25: f64,
        steps: &[StepPrediction],
    ) -> (ForecastRecord, std::result::Result<(), PersistenceError>) {
        let record = ForecastRecord::from_steps(timestamp, input_pm25, steps);

        let persisted = self.sink.append(&record);
        match &persisted {
            Ok(()) => info!(sink = self.sink.name(), "Forecast recorded"),
            Err(e) => warn!(sink = self.sink.name(), error = %e, "Failed to record forecast"),
        }

        (record, persisted)
    }
}

/// Sink that drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl ForecastSink for DiscardSink {
    fn name(&self) -> &str {
        "discard"
    }

    fn append(&self, _record: &ForecastRecord) -> std::result::Result<(), PersistenceError> {
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    timestamp: String,
    input_pm25: f64,
    pm25_forecast: String,
    aqi_forecast: String,
    confidence: String,
}

fn encode<T: Serialize>(values: &[T]) -> std::result::Result<String, PersistenceError> {
    serde_json::to_string(values).map_err(|e| PersistenceError::Encoding(e.to_string()))
}

fn decode<T: for<'de> Deserialize<'de>>(
    column: &str,
    cell: &str,
) -> std::result::Result<Vec<T>, PersistenceError> {
    serde_json::from_str(cell)
        .map_err(|e| PersistenceError::Encoding(format!("{}: {}", column, e)))
}

impl CsvRow {
    fn from_record(record: &ForecastRecord) -> std::result::Result<Self, PersistenceError> {
        let pm25: Vec<f64> = record.pm25_forecast.iter().map(|v| round_to(*v, 2)).collect();
        let confidence: Vec<f64> = record.confidence.iter().map(|v| round_to(*v, 3)).collect();

        Ok(Self {
            timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            input_pm25: record.input_pm25,
            pm25_forecast: encode(&pm25)?,
            aqi_forecast: encode(&record.aqi_forecast)?,
            confidence: encode(&confidence)?,
        })
    }

    fn into_record(self) -> std::result::Result<ForecastRecord, PersistenceError> {
        let timestamp = Observation::parse_timestamp(&self.timestamp).ok_or_else(|| {
            PersistenceError::Encoding(format!("timestamp: '{}'", self.timestamp))
        })?;

        Ok(ForecastRecord {
            timestamp,
            input_pm25: self.input_pm25,
            pm25_forecast: decode("pm25_forecast", &self.pm25_forecast)?,
            aqi_forecast: decode("aqi_forecast", &self.aqi_forecast)?,
            confidence: decode("confidence", &self.confidence)?,
        })
    }
}

/// Append-only CSV results log.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ForecastSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn append(&self, record: &ForecastRecord) -> std::result::Result<(), PersistenceError> {
        let row = CsvRow::from_record(record)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PersistenceError::Io(format!("{}: {}", self.path.display(), e)))?;
        let is_empty = file
            .metadata()
            .map_err(|e| PersistenceError::Io(e.to_string()))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);
        writer
            .serialize(&row)
            .map_err(|e| PersistenceError::Csv(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| PersistenceError::Io(e.to_string()))?;

        Ok(())
    }
}

/// Every record in a results log, oldest first.
pub fn read_records(path: &Path) -> std::result::Result<Vec<ForecastRecord>, PersistenceError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path)
        .map_err(|e| PersistenceError::Io(format!("{}: {}", path.display(), e)))?;

    let mut reader = csv::Reader::from_reader(BufReader::new(file));
    reader
        .deserialize::<CsvRow>()
        .map(|row| {
            row.map_err(|e| PersistenceError::Csv(e.to_string()))
                .and_then(CsvRow::into_record)
        })
        .collect()
}

/// Most recent record in a results log.
///
/// `None` when the file is missing or holds only a header.
pub fn read_latest(path: &Path) -> std::result::Result<Option<ForecastRecord>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)
        .map_err(|e| PersistenceError::Io(format!("{}: {}", path.display(), e)))?;

    let mut reader = csv::Reader::from_reader(BufReader::new(file));
    let mut last = None;
    for row in reader.deserialize::<CsvRow>() {
        last = Some(row.map_err(|e| PersistenceError::Csv(e.to_string()))?);
    }

    last.map(CsvRow::into_record).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn ts(raw: &str) -> NaiveDateTime {
        Observation::parse_timestamp(raw).unwrap()
    }

    fn sample_steps() -> Vec<StepPrediction> {
        vec![
            StepPrediction::new(42.1349, 117, 0.91234),
            StepPrediction::new(38.5, 108, 0.9),
            StepPrediction::new(44.1, 122, 0.93),
            StepPrediction::new(37.2, 105, 0.88),
            StepPrediction::new(41.0, 114, 0.9106),
        ]
    }

    struct MemorySink(Mutex<Vec<ForecastRecord>>);

    impl ForecastSink for MemorySink {
        fn name(&self) -> &str {
            "memory"
        }

        fn append(&self, record: &ForecastRecord) -> std::result::Result<(), PersistenceError> {
            self.0.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl ForecastSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn append(&self, _record: &ForecastRecord) -> std::result::Result<(), PersistenceError> {
            Err(PersistenceError::Io("disk full".to_string()))
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(42.1349, 2), 42.13);
        assert_eq!(round_to(0.91234, 3), 0.912);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
    }

    #[test]
    fn test_recorder_appends_full_precision() {
        let sink = Arc::new(MemorySink(Mutex::new(Vec::new())));
        let recorder = ResultRecorder::new(sink.clone());

        let (record, persisted) = recorder.record(ts("2024-01-01 10:00:00"), 40.0, &sample_steps());

        assert!(persisted.is_ok());
        assert_eq!(record.pm25_forecast[0], 42.1349);
        assert_eq!(sink.0.lock().unwrap().as_slice(), &[record]);
    }

    #[test]
    fn test_recorder_keeps_record_on_failure() {
        let recorder = ResultRecorder::new(Arc::new(FailingSink));

        let (record, persisted) = recorder.record(ts("2024-01-01 10:00:00"), 40.0, &sample_steps());

        assert!(matches!(persisted, Err(PersistenceError::Io(_))));
        assert_eq!(record.len(), 5);
        assert!(record.is_consistent());
    }

    #[test]
    fn test_csv_sink_writes_header_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_RESULTS_FILE);
        let sink = CsvSink::new(&path);
        let record = ForecastRecord::from_steps(ts("2024-01-01 10:00:00"), 40.0, &sample_steps());

        sink.append(&record).unwrap();
        sink.append(&record).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,input_pm25,pm25_forecast,aqi_forecast,confidence");
        assert!(lines[1].starts_with("2024-01-01 10:00:00,40.0,"));
        assert!(lines[1].contains("\"[42.13,38.5,44.1,37.2,41.0]\""));
        assert!(lines[1].contains("\"[117,108,122,105,114]\""));
        assert!(lines[1].contains("\"[0.912,0.9,0.93,0.88,0.911]\""));
    }

    #[test]
    fn test_csv_sink_header_when_file_preexists_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        fs::write(&path, "").unwrap();

        let sink = CsvSink::new(&path);
        let record = ForecastRecord::from_steps(ts("2024-01-01 10:00:00"), 40.0, &sample_steps());
        sink.append(&record).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("timestamp,"));
    }

    #[test]
    fn test_csv_sink_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("missing").join("results.csv"));
        let record = ForecastRecord::from_steps(ts("2024-01-01 10:00:00"), 40.0, &sample_steps());

        assert!(matches!(sink.append(&record), Err(PersistenceError::Io(_))));
    }

    #[test]
    fn test_read_latest_returns_last_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        let sink = CsvSink::new(&path);

        let first = ForecastRecord::from_steps(ts("2024-01-01 10:00:00"), 40.0, &sample_steps());
        let second = ForecastRecord::from_steps(ts("2024-01-01 11:00:00"), 12.5, &sample_steps());
        sink.append(&first).unwrap();
        sink.append(&second).unwrap();

        let latest = read_latest(&path).unwrap().unwrap();
        assert_eq!(latest.timestamp, ts("2024-01-01 11:00:00"));
        assert_eq!(latest.input_pm25, 12.5);
        assert_eq!(latest.pm25_forecast[0], 42.13);
        assert_eq!(latest.aqi_forecast, vec![117, 108, 122, 105, 114]);
        assert_eq!(latest.confidence[0], 0.912);

        assert_eq!(read_records(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_read_latest_missing_or_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        assert!(read_latest(&path).unwrap().is_none());

        fs::write(&path, "timestamp,input_pm25,pm25_forecast,aqi_forecast,confidence\n").unwrap();
        assert!(read_latest(&path).unwrap().is_none());
        assert!(read_records(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_latest_rejects_corrupt_cell() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        fs::write(
            &path,
            "timestamp,input_pm25,pm25_forecast,aqi_forecast,confidence\n\
             2024-01-01 10:00:00,40.0,\"[1,2\",\"[1]\",\"[1]\"\n",
        )
        .unwrap();

        assert!(matches!(read_latest(&path), Err(PersistenceError::Encoding(_))));
    }
}
