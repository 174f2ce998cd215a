//! Trait for durable forecast storage.

use crate::error::PersistenceError;
use crate::model::ForecastRecord;

/// Append-only store of forecast records.
pub trait ForecastSink: Send + Sync {
    /// Sink name for logs.
    fn name(&self) -> &str;

    /// Append one record.
    fn append(&self, record: &ForecastRecord) -> Result<(), PersistenceError>;
}
