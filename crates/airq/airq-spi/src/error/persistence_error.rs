//! Persistence error types.

use thiserror::Error;

/// Errors raised by the results sink.
///
/// A persistence failure never invalidates the forecast that was being stored.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    /// Opening or writing the storage failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Row could not be written or read as CSV
    #[error("CSV error: {0}")]
    Csv(String),

    /// A sequence cell could not be encoded or decoded
    #[error("Encoding error: {0}")]
    Encoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_message() {
        let error = PersistenceError::Io("permission denied".to_string());
        assert_eq!(error.to_string(), "I/O error: permission denied");
    }

    #[test]
    fn test_encoding_message() {
        let error = PersistenceError::Encoding("bad array".to_string());
        assert_eq!(error.to_string(), "Encoding error: bad array");
    }
}
