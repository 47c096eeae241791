//! OAuth error types.

/// OAuth errors.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Consumer key or consumer secret is empty.
    #[error("Consumer key and consumer secret are required for signing")]
    MissingConsumerCredentials,

    /// The request URL could not be parsed.
    #[error("URL parsing failed: {0}")]
    UrlError(#[from] url::ParseError),

    /// The request URL parsed but cannot be used as a signature base URL.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// HMAC or clock failure while producing a signature.
    #[error("OAuth 1.0a signature error: {0}")]
    SignatureError(String),

    /// Token endpoint returned something other than the expected form body.
    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    /// An `Authorization` header could not be decoded.
    #[error("Malformed Authorization header: {0}")]
    MalformedHeader(String),
}

/// Result type for OAuth operations.
pub type OAuthResult<T> = Result<T, OAuthError>;
