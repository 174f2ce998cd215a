//! Model evaluation
//!
//! Accuracy metrics and the training report produced when the forest is
//! built from history: a chronological holdout plus k-fold cross-validation.

use std::fmt;

use airq_spi::{ForestParams, Result};
use serde::Serialize;
use tracing::info;

use crate::ensemble::RandomForest;
use crate::history::{LagDataset, LAG_1H_COLUMN, LAG_24H_COLUMN};

/// Holdout fraction used for the training report.
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
/// Number of cross-validation folds.
pub const DEFAULT_CV_FOLDS: usize = 5;

/// Mean of `loss(actual, predicted)` over paired values, or `None` when the
/// slices are empty or differ in length.
fn mean_loss(actual: &[f64], predicted: &[f64], loss: impl Fn(f64, f64) -> f64) -> Option<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }
    let total: f64 = actual.iter().zip(predicted).map(|(&a, &p)| loss(a, p)).sum();
    Some(total / actual.len() as f64)
}

/// Mean absolute error in µg/m³. NaN for empty or mismatched inputs.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_loss(actual, predicted, |a, p| (a - p).abs()).unwrap_or(f64::NAN)
}

/// Root mean squared error in µg/m³. NaN for empty or mismatched inputs.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_loss(actual, predicted, |a, p| (a - p) * (a - p))
        .map(f64::sqrt)
        .unwrap_or(f64::NAN)
}

/// Coefficient of determination.
///
/// A constant `actual` scores 1.0 when matched exactly and 0.0 otherwise.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let Some(mse) = mean_loss(actual, predicted, |a, p| (a - p) * (a - p)) else {
        return f64::NAN;
    };
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let variance = actual.iter().map(|a| (a - mean) * (a - mean)).sum::<f64>()
        / actual.len() as f64;

    if variance < 1e-12 {
        return if mse < 1e-12 { 1.0 } else { 0.0 };
    }

    1.0 - mse / variance
}

/// Estimated accuracy in percent: `max(0, (1 - MAE / mean(actual)) × 100)`.
pub fn accuracy_pct(actual: &[f64], predicted: &[f64]) -> f64 {
    let error = mae(actual, predicted);
    if error.is_nan() {
        return f64::NAN;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    if mean.abs() < 1e-10 {
        return 0.0;
    }
    ((1.0 - error / mean) * 100.0).max(0.0)
}

/// K-fold cross-validation scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidation {
    pub folds: usize,
    pub mae_mean: f64,
    /// Population standard deviation of the per-fold MAE
    pub mae_std: f64,
    pub r2_mean: f64,
}

/// Cross-validate a forest configuration over contiguous folds.
pub fn cross_validate(
    dataset: &LagDataset,
    params: &ForestParams,
    k: usize,
) -> Result<CrossValidation> {
    let mut maes = Vec::with_capacity(k);
    let mut r2s = Vec::with_capacity(k);

    for (train, test) in dataset.kfold(k)? {
        let mut forest = RandomForest::new(params.clone())?;
        forest.fit(&train.features, &train.targets)?;
        let predicted = forest.predict_batch(&test.features)?;
        maes.push(mae(&test.targets, &predicted));
        r2s.push(r_squared(&test.targets, &predicted));
    }

    let mae_mean = maes.iter().sum::<f64>() / k as f64;
    let mae_std = (maes.iter().map(|m| (m - mae_mean).powi(2)).sum::<f64>() / k as f64).sqrt();
    let r2_mean = r2s.iter().sum::<f64>() / k as f64;

    Ok(CrossValidation {
        folds: k,
        mae_mean,
        mae_std,
        r2_mean,
    })
}

/// Training report for a fitted forest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelReport {
    pub n_train: usize,
    pub n_test: usize,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    pub accuracy_pct: f64,
    pub cross_validation: CrossValidation,
    pub feature_importances: Vec<(String, f64)>,
}

impl fmt::Display for ModelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Training samples: {}", self.n_train)?;
        writeln!(f, "Test samples: {}", self.n_test)?;
        writeln!(
            f,
            "Cross-Validation MAE: {:.2} ± {:.2} µg/m³",
            self.cross_validation.mae_mean, self.cross_validation.mae_std
        )?;
        writeln!(f, "Cross-Validation R²: {:.3}", self.cross_validation.r2_mean)?;
        writeln!(f, "Mean Absolute Error (MAE): {:.2} µg/m³", self.mae)?;
        writeln!(f, "Root Mean Square Error (RMSE): {:.2} µg/m³", self.rmse)?;
        writeln!(f, "R² Score: {:.3}", self.r2)?;
        write!(f, "Estimated Accuracy: {:.1}%", self.accuracy_pct)?;
        for (name, importance) in &self.feature_importances {
            write!(f, "\n{}: {:.3}", name, importance)?;
        }
        Ok(())
    }
}

/// Fit a forest on the chronological training split and score it.
///
/// Cross-validation runs over the whole dataset; the returned forest is the
/// one fitted on the training split.
pub fn train_and_evaluate(
    dataset: &LagDataset,
    params: &ForestParams,
    test_fraction: f64,
    folds: usize,
) -> Result<(RandomForest, ModelReport)> {
    let (train, test) = dataset.split_chronological(test_fraction)?;

    let cross_validation = cross_validate(dataset, params, folds)?;

    let mut forest = RandomForest::new(params.clone())?;
    forest.fit(&train.features, &train.targets)?;
    let predicted = forest.predict_batch(&test.features)?;

    let names = [LAG_1H_COLUMN, LAG_24H_COLUMN];
    let feature_importances = names
        .iter()
        .map(|n| n.to_string())
        .zip(forest.feature_importances())
        .collect();

    let report = ModelReport {
        n_train: train.len(),
        n_test: test.len(),
        mae: mae(&test.targets, &predicted),
        rmse: rmse(&test.targets, &predicted),
        r2: r_squared(&test.targets, &predicted),
        accuracy_pct: accuracy_pct(&test.targets, &predicted),
        cross_validation,
        feature_importances,
    };

    info!(
        n_train = report.n_train,
        n_test = report.n_test,
        mae = report.mae,
        r2 = report.r2,
        "Model trained"
    );

    Ok((forest, report))
}
