//! Model error types

use thiserror::Error;

/// Errors that leave the ensemble unable to produce a forecast.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Ensemble holds no fitted members
    #[error("Ensemble has no trained members")]
    NoMembers,

    /// Feature row or forecast input cannot be fed to the model
    #[error("Invalid features: {0}")]
    InvalidFeatures(String),

    /// A member returned NaN or an infinite value
    #[error("Non-finite prediction from member {member}")]
    NonFinitePrediction { member: usize },

    /// Insufficient data points for training or evaluation
    #[error("Insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Training history could not be read
    #[error("History error: {0}")]
    History(String),

    /// Saved model artifact could not be read or written
    #[error("Model artifact error: {0}")]
    Artifact(String),
}
