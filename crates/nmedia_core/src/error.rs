use serde::Serialize;
use thiserror::Error;

/// Unified error type for nmedia operations
#[derive(Debug, Error)]
pub enum FeedError {
    // Remote errors
    #[error("API error {code}: {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Response body, or the status reason when the body is empty
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    // Local store errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Config errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Result type alias for nmedia operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// The three-way classification presentation code reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Non-2xx response from the server
    Api,
    /// Transport failure (no connectivity, timeout, refused connection)
    Network,
    /// Anything else, including empty or malformed bodies and local failures
    Unknown,
}

impl FeedError {
    /// Classify this error for the presentation layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::Api { .. } => ErrorKind::Api,
            FeedError::Network(_) => ErrorKind::Network,
            _ => ErrorKind::Unknown,
        }
    }

    /// Whether a paged load that failed with this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Network(_) => true,
            FeedError::Api { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// Convert to a serializable representation for presentation code
    pub fn to_response(&self) -> FeedResponse {
        FeedResponse::from(self)
    }
}

/// A serializable representation of [`FeedError`] for a user-visible banner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedResponse {
    /// HTTP status for API errors, 0 otherwise
    pub code: u16,
    /// Human-readable error message
    pub message: Option<String>,
}

impl From<&FeedError> for FeedResponse {
    fn from(err: &FeedError) -> Self {
        match err {
            FeedError::Api { code, message } => Self {
                code: *code,
                message: Some(message.clone()),
            },
            other => Self {
                code: 0,
                message: Some(other.to_string()),
            },
        }
    }
}

impl From<FeedError> for FeedResponse {
    fn from(err: FeedError) -> Self {
        FeedResponse::from(&err)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            FeedError::Api {
                code: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            }
        } else if err.is_timeout() || err.is_connect() || err.is_request() {
            FeedError::Network(err.to_string())
        } else if err.is_body() || err.is_decode() {
            // JSON is decoded by serde_json; reqwest only fails here when the
            // body stream itself breaks
            FeedError::Network(err.to_string())
        } else {
            FeedError::Unknown(err.to_string())
        }
    }
}
