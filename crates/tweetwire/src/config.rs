//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default capacity of the buffered stream queue.
pub const DEFAULT_BUFFER_CAPACITY: usize = 25;

/// Configuration for a [`TwitterClient`](crate::TwitterClient).
#[derive(Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    /// OAuth 1.0a Consumer Key (API Key)
    pub consumer_key: String,

    /// OAuth 1.0a Consumer Secret (API Secret)
    pub consumer_secret: String,

    /// OAuth 1.0a Access Token, if the user already authorized the app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// OAuth 1.0a Access Token Secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_secret: Option<String>,

    /// REST API host (default: api.twitter.com)
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// REST API path prefix (default: /1.1/)
    #[serde(default = "default_api_root")]
    pub api_root: String,

    /// OAuth handshake host (default: api.twitter.com)
    #[serde(default = "default_api_host")]
    pub oauth_host: String,

    /// OAuth handshake path prefix (default: /oauth/)
    #[serde(default = "default_oauth_root")]
    pub oauth_root: String,

    /// Send every request to this host instead of the API, OAuth or
    /// per-endpoint host (proxies, local test servers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_override: Option<String>,

    /// Use https (default: true)
    #[serde(default = "default_secure")]
    pub secure: bool,

    /// Whole-request timeout for non-streaming calls; none by default
    #[serde(default, with = "duration_secs_opt", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Connection establishment timeout
    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Longest wait for the next chunk of a streaming response
    #[serde(default = "default_stream_read_timeout", with = "duration_secs")]
    pub stream_read_timeout: Duration,

    /// Queue capacity for buffered stream consumption
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Load the authenticated user when an access token is set
    #[serde(default = "default_load_user")]
    pub load_user: bool,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_host() -> String {
    "api.twitter.com".into()
}

fn default_api_root() -> String {
    "/1.1/".into()
}

fn default_oauth_root() -> String {
    "/oauth/".into()
}

const fn default_secure() -> bool {
    true
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_stream_read_timeout() -> Duration {
    // Twitter sends a keep-alive newline every 30 seconds.
    Duration::from_secs(90)
}

const fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

const fn default_load_user() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("tweetwire/{}", env!("CARGO_PKG_VERSION"))
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod duration_secs_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

impl TwitterConfig {
    /// Consumer-only configuration with defaults for everything else.
    #[must_use]
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            ..Self::default()
        }
    }

    /// Set the access token pair.
    #[must_use]
    pub fn with_access_token(
        mut self,
        token: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.access_token = Some(token.into());
        self.access_token_secret = Some(secret.into());
        self
    }

    /// URL scheme implied by `secure`.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            access_token: None,
            access_token_secret: None,
            api_host: default_api_host(),
            api_root: default_api_root(),
            oauth_host: default_api_host(),
            oauth_root: default_oauth_root(),
            host_override: None,
            secure: default_secure(),
            timeout: None,
            connect_timeout: default_connect_timeout(),
            stream_read_timeout: default_stream_read_timeout(),
            buffer_capacity: default_buffer_capacity(),
            load_user: default_load_user(),
            user_agent: default_user_agent(),
        }
    }
}

impl std::fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("consumer_key", &self.consumer_key)
            .field("access_token", &self.access_token)
            .field("api_host", &self.api_host)
            .field("api_root", &self.api_root)
            .field("oauth_host", &self.oauth_host)
            .field("oauth_root", &self.oauth_root)
            .field("host_override", &self.host_override)
            .field("secure", &self.secure)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("stream_read_timeout", &self.stream_read_timeout)
            .field("buffer_capacity", &self.buffer_capacity)
            .field("load_user", &self.load_user)
            .finish_non_exhaustive()
    }
}

/// Rate limit information from Twitter API headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum number of requests allowed in the window
    pub limit: Option<u32>,

    /// Remaining requests in the current window
    pub remaining: Option<u32>,

    /// Unix timestamp when the rate limit resets
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    /// Parse rate limit info from response headers.
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        fn parse<T: std::str::FromStr>(
            headers: &reqwest::header::HeaderMap,
            name: &str,
        ) -> Option<T> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        }

        Self {
            limit: parse(headers, "x-rate-limit-limit"),
            remaining: parse(headers, "x-rate-limit-remaining"),
            reset: parse(headers, "x-rate-limit-reset"),
        }
    }

    /// Check if we're rate limited (remaining == 0).
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Get the duration until rate limit resets.
    #[must_use]
    pub fn time_until_reset(&self) -> Option<Duration> {
        let reset = self.reset?;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?
            .as_secs();

        (reset > now).then(|| Duration::from_secs(reset - now))
    }
}
