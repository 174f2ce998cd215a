//! Run boundary error type.

use thiserror::Error;

use super::{ModelError, SourceError};

/// Why a forecast run produced no forecast.
///
/// Persistence failures are deliberately absent: they are reported on the
/// run outcome instead of failing the run.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    /// Latest observation could not be obtained; no forecast attempted
    #[error("Source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    /// Ensemble could not forecast; nothing emitted
    #[error("Model unready: {0}")]
    ModelUnready(#[from] ModelError),
}
