//! Bootstrap-aggregated regression forest
//!
//! Each member is a [`RegressionTree`] grown on its own bootstrap sample. Tree
//! `i` draws from a `StdRng` seeded with `seed + i`, and trees are fitted in
//! parallel with rayon, so a given dataset and parameter set always produce the
//! same forest.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use airq_spi::{EnsembleRegressor, ForestParams, LagWindow, ModelError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree::{RegressionTree, TreeParams};

/// Model input row: `[lag_1h, lag_24h]`.
pub type FeatureRow = [f64; LagWindow::N_FEATURES];

/// Random forest regressor over lag features.
///
/// # Example
///
/// ```rust
/// use airq_core::ensemble::RandomForest;
/// use airq_spi::{EnsembleRegressor, ForestParams, LagWindow};
///
/// let rows: Vec<[f64; 2]> = (0..50).map(|i| [i as f64, i as f64 * 0.9]).collect();
/// let targets: Vec<f64> = (0..50).map(|i| i as f64 + 1.0).collect();
///
/// let mut forest = RandomForest::new(ForestParams { n_estimators: 10, ..Default::default() }).unwrap();
/// forest.fit(&rows, &targets).unwrap();
/// let per_tree = forest.member_predictions(&LagWindow::new(20.0, 18.0)).unwrap();
/// assert_eq!(per_tree.len(), 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Create an unfitted forest.
    pub fn new(params: ForestParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            trees: Vec::new(),
        })
    }

    /// Fit all trees on `rows` → `targets`.
    pub fn fit(&mut self, rows: &[FeatureRow], targets: &[f64]) -> Result<()> {
        if rows.len() != targets.len() {
            return Err(ModelError::InvalidFeatures(format!(
                "{} feature rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if rows.len() < 2 {
            return Err(ModelError::InsufficientData {
                required: 2,
                actual: rows.len(),
            });
        }
        if rows.iter().flatten().chain(targets).any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidFeatures(
                "training data contains non-finite values".to_string(),
            ));
        }

        let n = rows.len();
        let tree_params = TreeParams::from(&self.params);
        let bootstrap = self.params.bootstrap;
        let seed = self.params.seed;

        self.trees = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|member| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(member as u64));
                let indices: Vec<usize> = if bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(rows, targets, &indices, &tree_params)
            })
            .collect();

        debug!(
            trees = self.trees.len(),
            rows = n,
            "fitted random forest"
        );
        Ok(())
    }

    /// Whether `fit` has completed.
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Hyperparameters.
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Fitted members.
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Ensemble mean for one row.
    pub fn predict(&self, row: &FeatureRow) -> Result<f64> {
        let preds = self.predict_members(row)?;
        Ok(preds.iter().sum::<f64>() / preds.len() as f64)
    }

    /// Ensemble mean for many rows.
    pub fn predict_batch(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    fn predict_members(&self, row: &FeatureRow) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(ModelError::NoMembers);
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidFeatures(format!(
                "non-finite feature row {:?}",
                row
            )));
        }
        Ok(self.trees.iter().map(|tree| tree.predict(row)).collect())
    }

    /// Impurity-based importances: per-tree normalized, averaged over trees.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; LagWindow::N_FEATURES];
        if self.trees.is_empty() {
            return totals;
        }
        for tree in &self.trees {
            for (total, importance) in totals.iter_mut().zip(tree.feature_importances()) {
                *total += importance;
            }
        }
        let n = self.trees.len() as f64;
        totals.iter_mut().for_each(|t| *t /= n);
        totals
    }

    /// Write the fitted forest as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if !self.is_fitted() {
            return Err(ModelError::NoMembers);
        }
        let file = File::create(path)
            .map_err(|e| ModelError::Artifact(format!("{}: {}", path.display(), e)))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .map_err(|e| ModelError::Artifact(e.to_string()))
    }

    /// Read a forest written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| ModelError::Artifact(format!("{}: {}", path.display(), e)))?;
        let forest: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ModelError::Artifact(e.to_string()))?;
        if !forest.is_fitted() {
            return Err(ModelError::NoMembers);
        }
        forest.params.validate()?;
        for (member, tree) in forest.trees.iter().enumerate() {
            tree.check_structure(LagWindow::N_FEATURES)
                .map_err(|reason| ModelError::Artifact(format!("tree {}: {}", member, reason)))?;
        }
        Ok(forest)
    }
}

impl EnsembleRegressor for RandomForest {
    fn n_members(&self) -> usize {
        self.trees.len()
    }

    fn member_predictions(&self, window: &LagWindow) -> Result<Vec<f64>> {
        self.predict_members(&window.features())
    }
}
