//! Fetch Error Types
//!
//! Network-layer failures reported by a fetch collaborator.
//! Maps HTTP status codes to specific variants so callers can decide on retries.

/// Fetch error types
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limited, try again after backoff")]
    RateLimited,

    #[error("Request timeout")]
    Timeout,

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl FetchError {
    /// Whether retrying the same request may succeed
    ///
    /// The engine never retries on its own; this is for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited
                | FetchError::Timeout
                | FetchError::Network(_)
                | FetchError::Server(_, _)
        )
    }

    /// Create a FetchError from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            403 => FetchError::Forbidden(body.to_string()),
            404 | 410 => FetchError::NotFound(body.to_string()),
            408 => FetchError::Timeout,
            429 => FetchError::RateLimited,
            500..=599 => FetchError::Server(status, body.to_string()),
            _ => FetchError::Request(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() || err.is_request() || err.is_body() {
            FetchError::Network(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::from_status(status.as_u16(), &err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}
