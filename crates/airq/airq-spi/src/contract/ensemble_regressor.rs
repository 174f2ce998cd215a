//! Trait for ensemble regressors consumed by the forecast engine.

use crate::error::Result;
use crate::model::LagWindow;

/// A trained set of independent regressors over lag features.
///
/// The engine only needs per-member predictions; it derives the mean and the
/// cross-member spread itself.
pub trait EnsembleRegressor: Send + Sync {
    /// Number of fitted members.
    fn n_members(&self) -> usize;

    /// One PM2.5 prediction per member, in member order.
    ///
    /// Fails with [`ModelError::NoMembers`](crate::ModelError::NoMembers) when
    /// nothing is fitted and
    /// [`ModelError::InvalidFeatures`](crate::ModelError::InvalidFeatures) on a
    /// malformed window.
    fn member_predictions(&self, window: &LagWindow) -> Result<Vec<f64>>;
}
