//! Configuration and bootstrap errors.

use airq_spi::ModelError;
use thiserror::Error;

/// Invalid or incomplete process configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A required setting is absent
    #[error("Missing setting: {0}")]
    Missing(&'static str),

    /// A setting could not be parsed or is out of range
    #[error("Invalid {key}='{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Failure while preparing the model or wiring the service.
#[derive(Debug, Clone, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}
