use thiserror::Error;

/// Failure talking to the graph service, independent of which action issued the call.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request exceeded the configured per-request timeout
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Connection refused, reset, DNS, TLS...
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status; `message` is the service's `error` field when present
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// True for a 404, the service's "no such entity" answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// Main error type for equitynav
///
/// Every variant is scoped to the action that raised it; none of them leave the
/// session in a partially updated state.
#[derive(Error, Debug)]
pub enum EquityNavError {
    /// Rejected locally before any network call (empty query, missing identifier)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Entity-by-id fetch failed; the previously centered entity is kept
    #[error("Failed to load entity {id}: {source}")]
    Lookup {
        id: String,
        #[source]
        source: ApiError,
    },

    /// Search answered, but neither an exact nor a partial match exists
    #[error("No entity matches '{query}': {message}")]
    SearchNotFound { query: String, message: String },

    /// Search call itself failed
    #[error("Search for '{query}' failed: {source}")]
    Search {
        query: String,
        #[source]
        source: ApiError,
    },

    /// Equity analysis call failed; the result stays in its emptied shape
    #[error("Equity analysis for {anchor} failed: {source}")]
    Analysis {
        anchor: String,
        #[source]
        source: ApiError,
    },

    /// Graph statistics could not be loaded
    #[error("Graph statistics unavailable: {0}")]
    Stats(#[source] ApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient Result type using EquityNavError
pub type Result<T> = std::result::Result<T, EquityNavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EquityNavError::Config("bad base_url".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("bad base_url"));
    }

    #[test]
    fn test_lookup_error_keeps_source() {
        use std::error::Error as _;

        let err = EquityNavError::Lookup {
            id: "E1".to_string(),
            source: ApiError::Status {
                status: 404,
                message: "node does not exist".to_string(),
            },
        };
        assert!(err.to_string().contains("E1"));
        let source = err.source().expect("lookup error should chain its cause");
        assert!(source.to_string().contains("404"));
    }

    #[test]
    fn test_not_found_detection() {
        assert!(ApiError::Status { status: 404, message: String::new() }.is_not_found());
        assert!(!ApiError::Status { status: 500, message: String::new() }.is_not_found());
        assert!(!ApiError::Timeout(10).is_not_found());
    }
}
