//! Client error types.

use std::time::Duration;

use thiserror::Error;
use tweetwire_oauth::OAuthError;

/// Errors surfaced by the client. None of them are retried internally.
#[derive(Error, Debug)]
pub enum TwitterError {
    /// Consumer credentials missing or configuration unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Call arguments rejected against the endpoint catalog
    #[error("Parameter error: {0}")]
    Parameter(String),

    /// Twitter rejected the request
    #[error("Twitter API error {}: {description}", .code.map_or_else(|| "-".to_string(), |c| c.to_string()))]
    Api {
        code: Option<i64>,
        description: String,
        body: Option<String>,
        retry_after: Option<u64>,
    },

    /// Connection, socket or timeout failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A streaming response stalled longer than the read timeout
    #[error("No data received from stream for {0:?}")]
    ReadTimeout(Duration),

    /// A stream line exceeded the reader's length cap
    #[error("Stream line longer than {0} bytes")]
    LineTooLong(usize),

    /// The buffered stream consumer task was cancelled
    #[error("Stream consumer failed: {0}")]
    ConsumerFailed(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed token response or header
    #[error("OAuth error: {0}")]
    OAuth(OAuthError),

    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),
}

impl From<OAuthError> for TwitterError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::MissingConsumerCredentials => Self::Configuration(err.to_string()),
            OAuthError::UrlError(_) | OAuthError::InvalidBaseUrl(_) => {
                Self::Configuration(err.to_string())
            }
            other => Self::OAuth(other),
        }
    }
}

impl TwitterError {
    /// Build an API error with only a description.
    #[must_use]
    pub fn api(description: impl Into<String>) -> Self {
        Self::Api {
            code: None,
            description: description.into(),
            body: None,
            retry_after: None,
        }
    }

    /// Twitter error code, or the HTTP status when no envelope was returned.
    #[must_use]
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => *code,
            _ => None,
        }
    }

    /// Check if re-issuing the same request could succeed.
    ///
    /// Informational only; retry policy belongs to the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::ReadTimeout(_) => true,
            // 88: rate limit exceeded, 130: over capacity, 131: internal error.
            Self::Api { code, .. } => matches!(code, Some(88 | 130 | 131 | 429 | 500..=599)),
            _ => false,
        }
    }

    /// Get the suggested retry delay.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api { retry_after, .. } => retry_after.map(Duration::from_secs),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type TwitterResult<T> = Result<T, TwitterError>;
