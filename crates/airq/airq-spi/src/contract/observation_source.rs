//! Observation source trait definition.

use crate::error::SourceError;
use crate::model::Observation;

/// Supplier of the latest PM2.5 observation.
///
/// Implementations are synchronous request/response collaborators; retries
/// are not their concern.
pub trait ObservationSource: Send + Sync {
    /// Source name for logs.
    fn name(&self) -> &str;

    /// Fetch the most recent usable observation.
    fn fetch_latest(&self) -> Result<Observation, SourceError>;
}
