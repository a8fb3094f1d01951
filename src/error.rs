//! abn-lookup error types

/// abn-lookup error types
///
/// Every variant owns plain data so errors can be stored in cache entries
/// and handed to every subscriber of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    // Transport errors
    /// The request never completed (connect failure, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The registry answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Response { status: u16, message: String },

    /// A single-business lookup had no match.
    #[error("business not found: {0}")]
    NotFound(String),

    // Data errors
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl LookupError {
    /// Whether this is the "no such business" outcome of a detail lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether a manual retry of the same request might succeed.
    ///
    /// Network failures and server-side responses are retryable; a missing
    /// business, malformed input or bad configuration will fail the same way
    /// again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Decode(_) => true,
            Self::Response { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            Self::NotFound(_) | Self::InvalidInput(_) | Self::Configuration(_) => false,
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LookupError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            LookupError::Response {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            LookupError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::Decode(err.to_string())
    }
}

/// Result type alias for abn-lookup operations
pub type Result<T> = std::result::Result<T, LookupError>;
