//! Lag-feature training history
//!
//! Loads the historical CSV (`pm2_5`, `pm2_5_lag_1h`, `pm2_5_lag_24h`) and
//! pairs the lag features of row `i` with the concentration of row `i + 1`,
//! so the model learns to predict the next hour. The final row has no
//! successor and is dropped; pairs touching an unparsable cell are skipped.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use airq_spi::{ModelError, Result};

use crate::ensemble::FeatureRow;

/// Concentration column.
pub const TARGET_COLUMN: &str = "pm2_5";
/// One-hour lag column.
pub const LAG_1H_COLUMN: &str = "pm2_5_lag_1h";
/// Twenty-four-hour lag column.
pub const LAG_24H_COLUMN: &str = "pm2_5_lag_24h";

/// Feature rows and next-step targets in chronological order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LagDataset {
    /// `[lag_1h, lag_24h]` per sample
    pub features: Vec<FeatureRow>,
    /// PM2.5 one step after each feature row
    pub targets: Vec<f64>,
}

impl LagDataset {
    /// Build from parallel history columns.
    ///
    /// `None` marks a cell that could not be read.
    pub fn from_columns(
        pm25: &[Option<f64>],
        lag_1h: &[Option<f64>],
        lag_24h: &[Option<f64>],
    ) -> Self {
        let n = pm25.len().min(lag_1h.len()).min(lag_24h.len());
        let mut dataset = Self::default();

        for i in 0..n.saturating_sub(1) {
            if let (Some(l1), Some(l24), Some(next)) = (lag_1h[i], lag_24h[i], pm25[i + 1]) {
                dataset.features.push([l1, l24]);
                dataset.targets.push(next);
            }
        }

        dataset
    }

    /// Read a history CSV.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|e| ModelError::History(e.to_string()))?
            .clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| ModelError::History(format!("Column '{}' not found", name)))
        };
        let target_idx = column(TARGET_COLUMN)?;
        let lag_1h_idx = column(LAG_1H_COLUMN)?;
        let lag_24h_idx = column(LAG_24H_COLUMN)?;

        let mut pm25 = Vec::new();
        let mut lag_1h = Vec::new();
        let mut lag_24h = Vec::new();

        for result in reader.records() {
            let record = result.map_err(|e| ModelError::History(e.to_string()))?;
            let cell = |idx: usize| {
                record
                    .get(idx)
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .filter(|v| v.is_finite())
            };
            pm25.push(cell(target_idx));
            lag_1h.push(cell(lag_1h_idx));
            lag_24h.push(cell(lag_24h_idx));
        }

        Ok(Self::from_columns(&pm25, &lag_1h, &lag_24h))
    }

    /// Read a history CSV from disk.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| ModelError::History(format!("{}: {}", path.display(), e)))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether there are no samples.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Mean of the targets (NaN when empty).
    pub fn target_mean(&self) -> f64 {
        self.targets.iter().sum::<f64>() / self.targets.len() as f64
    }

    fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            features: self.features[start..end].to_vec(),
            targets: self.targets[start..end].to_vec(),
        }
    }

    fn concat(mut self, other: Self) -> Self {
        self.features.extend(other.features);
        self.targets.extend(other.targets);
        self
    }

    /// Chronological holdout: the last `ceil(test_fraction × n)` samples are the test set.
    pub fn split_chronological(&self, test_fraction: f64) -> Result<(Self, Self)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(ModelError::InvalidParameter {
                name: "test_fraction".to_string(),
                reason: "must be strictly between 0 and 1".to_string(),
            });
        }

        let n = self.len();
        let n_test = (test_fraction * n as f64).ceil() as usize;
        let n_train = n.saturating_sub(n_test);
        if n_train < 2 || n_test < 1 {
            return Err(ModelError::InsufficientData {
                required: 3,
                actual: n,
            });
        }

        Ok((self.slice(0, n_train), self.slice(n_train, n)))
    }

    /// Contiguous, unshuffled k-fold splits as `(train, test)` pairs.
    ///
    /// The first `n % k` folds hold one extra sample.
    pub fn kfold(&self, k: usize) -> Result<Vec<(Self, Self)>> {
        if k < 2 {
            return Err(ModelError::InvalidParameter {
                name: "k".to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        let n = self.len();
        if n < k * 2 {
            return Err(ModelError::InsufficientData {
                required: k * 2,
                actual: n,
            });
        }

        let base = n / k;
        let extra = n % k;
        let mut folds = Vec::with_capacity(k);
        let mut start = 0;

        for fold in 0..k {
            let size = base + usize::from(fold < extra);
            let end = start + size;
            let train = self.slice(0, start).concat(self.slice(end, n));
            folds.push((train, self.slice(start, end)));
            start = end;
        }

        Ok(folds)
    }
}
