//! Observation source error types.

use thiserror::Error;

/// Errors raised while obtaining the latest observation.
///
/// Every variant means the run is skipped: no forecast is attempted.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// HTTP request failed before a response arrived
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Remote answered with a non-success status
    #[error("Source responded with status {0}")]
    HttpStatus(u16),

    /// Response body was not the expected JSON shape
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Reading table was empty or no entry carried a usable reading
    #[error("No usable observation")]
    NoUsableObservation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failed_message() {
        let error = SourceError::RequestFailed("connection refused".to_string());
        assert_eq!(error.to_string(), "Request failed: connection refused");
    }

    #[test]
    fn test_http_status_message() {
        assert_eq!(
            SourceError::HttpStatus(401).to_string(),
            "Source responded with status 401"
        );
    }

    #[test]
    fn test_no_usable_observation_message() {
        assert_eq!(
            SourceError::NoUsableObservation.to_string(),
            "No usable observation"
        );
    }

    #[test]
    fn test_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SourceError>();
    }
}
