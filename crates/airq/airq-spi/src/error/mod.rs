//! Error module containing error types and result aliases

mod model_error;
mod persistence_error;
mod run_error;
mod source_error;

pub use model_error::ModelError;
pub use persistence_error::PersistenceError;
pub use run_error::RunError;
pub use source_error::SourceError;

/// Result type for model and forecast operations
pub type Result<T> = std::result::Result<T, ModelError>;
