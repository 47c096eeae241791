//! OAuth 1.0a request signing.
//!
//! Twitter requires an HMAC-SHA1 signature over a canonical form of every
//! user-context request. This module builds that canonical form (the
//! signature base string) and the `Authorization` header that carries the
//! resulting signature.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::RngCore;
use sha1::Sha1;
use url::Url;

use crate::{AuthorizationHeader, OAuthError, OAuthResult};

/// Characters left unescaped: RFC 3986 unreserved `ALPHA / DIGIT / "-" / "." / "_" / "~"`.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The only signature method this crate produces.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// Protocol version sent as `oauth_version`.
pub const OAUTH_VERSION: &str = "1.0";

/// HTTP method of a request being signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Uppercase method name as it appears in the signature base string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything about one outgoing request that takes part in signing.
///
/// Built per call and discarded afterwards. Signing only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDescription {
    /// HTTP method.
    pub method: Method,
    /// Scheme, host and path. Any query string here is ignored for signing.
    pub base_url: String,
    /// Query parameters in insertion order.
    pub query: Vec<(String, String)>,
    /// Form body parameters in insertion order.
    pub body: Vec<(String, String)>,
    /// Headers already attached to the request.
    pub headers: Vec<(String, String)>,
    /// The body carries binary file parts (multipart/form-data).
    pub multipart: bool,
}

impl RequestDescription {
    /// Create a description with no parameters.
    #[must_use]
    pub fn new(method: Method, base_url: impl Into<String>) -> Self {
        Self {
            method,
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a form body parameter.
    #[must_use]
    pub fn with_body(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.push((key.into(), value.into()));
        self
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Mark the body as multipart.
    #[must_use]
    pub const fn with_multipart(mut self, multipart: bool) -> Self {
        self.multipart = multipart;
        self
    }
}

/// Token pair currently held by a client.
///
/// The request pair only exists between `request_token` and `access_token`
/// during the authorization handshake, so the two can never coexist.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum TokenState {
    /// No user context; requests are signed with the consumer secret only.
    #[default]
    None,
    /// Temporary credentials obtained from `oauth/request_token`.
    Request {
        /// `oauth_token`.
        token: String,
        /// `oauth_token_secret`.
        secret: String,
    },
    /// Token credentials obtained from `oauth/access_token`.
    Access {
        /// `oauth_token`.
        token: String,
        /// `oauth_token_secret`.
        secret: String,
    },
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Request { token, .. } => f
                .debug_struct("Request")
                .field("token", token)
                .field("secret", &"[REDACTED]")
                .finish(),
            Self::Access { token, .. } => f
                .debug_struct("Access")
                .field("token", token)
                .field("secret", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Consumer credentials plus the token pair of the current handshake stage.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    consumer_key: String,
    consumer_secret: String,
    tokens: TokenState,
}

impl Credentials {
    /// Consumer-only credentials.
    #[must_use]
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            tokens: TokenState::None,
        }
    }

    /// Credentials that already hold an access token pair.
    #[must_use]
    pub fn with_access_token(
        mut self,
        token: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.set_access_token(token, secret);
        self
    }

    /// Consumer key (API key).
    #[must_use]
    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    /// Current token state.
    #[must_use]
    pub const fn tokens(&self) -> &TokenState {
        &self.tokens
    }

    /// Whether both halves of the consumer credentials are present.
    #[must_use]
    pub fn has_consumer(&self) -> bool {
        !self.consumer_key.is_empty() && !self.consumer_secret.is_empty()
    }

    /// Whether an access token pair is held.
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        matches!(self.tokens, TokenState::Access { .. })
    }

    /// Enter the handshake: store temporary request credentials.
    pub fn set_request_token(&mut self, token: impl Into<String>, secret: impl Into<String>) {
        self.tokens = TokenState::Request {
            token: token.into(),
            secret: secret.into(),
        };
    }

    /// Finish the handshake or replace credentials explicitly.
    pub fn set_access_token(&mut self, token: impl Into<String>, secret: impl Into<String>) {
        self.tokens = TokenState::Access {
            token: token.into(),
            secret: secret.into(),
        };
    }

    /// Drop any token pair.
    pub fn clear_tokens(&mut self) {
        self.tokens = TokenState::None;
    }

    /// Value for `oauth_token`, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match &self.tokens {
            TokenState::None => None,
            TokenState::Request { token, .. } | TokenState::Access { token, .. } => Some(token),
        }
    }

    /// Token secret used in the signing key; empty without a token.
    #[must_use]
    pub fn token_secret(&self) -> &str {
        match &self.tokens {
            TokenState::None => "",
            TokenState::Request { secret, .. } | TokenState::Access { secret, .. } => secret,
        }
    }

    fn signing_key(&self) -> String {
        format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(self.token_secret())
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("tokens", &self.tokens)
            .finish()
    }
}

/// The `oauth_*` protocol parameters of one signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthParams {
    /// `oauth_consumer_key`.
    pub consumer_key: String,
    /// `oauth_nonce`.
    pub nonce: String,
    /// `oauth_signature_method`.
    pub signature_method: String,
    /// `oauth_timestamp`, Unix seconds.
    pub timestamp: String,
    /// `oauth_version`.
    pub version: String,
    /// `oauth_token`.
    pub token: Option<String>,
    /// `oauth_callback`, only sent when starting the handshake.
    pub callback: Option<String>,
}

impl OAuthParams {
    /// Fresh parameters: new nonce, current time.
    pub fn generate(credentials: &Credentials, callback: Option<&str>) -> OAuthResult<Self> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| OAuthError::SignatureError(format!("Failed to get timestamp: {e}")))?
            .as_secs();

        let mut params = Self::fixed(credentials, generate_nonce(), timestamp);
        params.callback = callback.map(str::to_string);
        Ok(params)
    }

    /// Parameters with a caller-chosen nonce and timestamp.
    #[must_use]
    pub fn fixed(credentials: &Credentials, nonce: impl Into<String>, timestamp: u64) -> Self {
        Self {
            consumer_key: credentials.consumer_key().to_string(),
            nonce: nonce.into(),
            signature_method: SIGNATURE_METHOD.to_string(),
            timestamp: timestamp.to_string(),
            version: OAUTH_VERSION.to_string(),
            token: credentials.token().map(str::to_string),
            callback: None,
        }
    }

    /// Set `oauth_callback`.
    #[must_use]
    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    /// Named protocol parameters, unencoded.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::with_capacity(7);
        if let Some(callback) = &self.callback {
            pairs.push(("oauth_callback", callback.as_str()));
        }
        pairs.push(("oauth_consumer_key", self.consumer_key.as_str()));
        pairs.push(("oauth_nonce", self.nonce.as_str()));
        pairs.push(("oauth_signature_method", self.signature_method.as_str()));
        pairs.push(("oauth_timestamp", self.timestamp.as_str()));
        if let Some(token) = &self.token {
            pairs.push(("oauth_token", token.as_str()));
        }
        pairs.push(("oauth_version", self.version.as_str()));
        pairs
    }
}

/// Sign a request and build its `Authorization` header.
///
/// Deterministic for a fixed `params`; use [`OAuthParams::generate`] for a
/// fresh nonce and timestamp.
///
/// # Errors
///
/// [`OAuthError::MissingConsumerCredentials`] when the consumer key or secret
/// is empty, or a URL error when `request.base_url` does not parse.
pub fn sign(
    request: &RequestDescription,
    credentials: &Credentials,
    params: &OAuthParams,
) -> OAuthResult<AuthorizationHeader> {
    if !credentials.has_consumer() || params.consumer_key.is_empty() {
        return Err(OAuthError::MissingConsumerCredentials);
    }

    let base_string = signature_base_string(request, params)?;
    let signature = hmac_sha1(&credentials.signing_key(), &base_string)?;

    let mut fields: Vec<(&str, &str)> = params.pairs();
    fields.push(("oauth_signature", signature.as_str()));

    Ok(AuthorizationHeader::from_params(fields))
}

/// `METHOD&encode(base_url)&encode(parameter_string)`.
pub fn signature_base_string(
    request: &RequestDescription,
    params: &OAuthParams,
) -> OAuthResult<String> {
    let mut pairs: Vec<(&str, &str)> = Vec::new();

    // File uploads are signed over the protocol parameters alone.
    if !request.multipart {
        pairs.extend(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        pairs.extend(request.body.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    pairs.extend(params.pairs());

    let base_url = normalize_base_url(&request.base_url)?;

    Ok(format!(
        "{}&{}&{}",
        request.method.as_str(),
        percent_encode(&base_url),
        percent_encode(&parameter_string(pairs))
    ))
}

/// Normalized parameter string: encode, sort, join.
///
/// Pairs are sorted by their encoded `key=value` form, then stably by the
/// ASCII-uppercased encoded key. The second pass groups keys that differ only
/// in case while keeping the first pass's order inside each group.
pub fn parameter_string<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut encoded: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(k, v)| (percent_encode(k.as_ref()), percent_encode(v.as_ref())))
        .collect();

    encoded.sort_by(|a, b| joined_bytes(a).cmp(joined_bytes(b)));
    encoded.sort_by(|a, b| {
        let lhs = a.0.bytes().map(|c| c.to_ascii_uppercase());
        let rhs = b.0.bytes().map(|c| c.to_ascii_uppercase());
        lhs.cmp(rhs)
    });

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn joined_bytes((key, value): &(String, String)) -> impl Iterator<Item = u8> + '_ {
    key.bytes()
        .chain(std::iter::once(b'='))
        .chain(value.bytes())
}

/// Scheme, host, non-default port and path; query and fragment dropped.
pub fn normalize_base_url(url: &str) -> OAuthResult<String> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| OAuthError::InvalidBaseUrl(format!("{url} has no host")))?;

    Ok(match parsed.port() {
        Some(port) => format!("{}://{host}:{port}{}", parsed.scheme(), parsed.path()),
        None => format!("{}://{host}{}", parsed.scheme(), parsed.path()),
    })
}

/// Percent-encode a string per RFC 3986, as OAuth 1.0a requires.
#[must_use]
pub fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// 256 random bits, base64 without trailing padding.
#[must_use]
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64.encode(bytes).trim_end_matches('=').to_string()
}

/// Compute HMAC-SHA1 and return the base64-encoded digest.
fn hmac_sha1(key: &str, data: &str) -> OAuthResult<String> {
    type HmacSha1 = Hmac<Sha1>;

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| OAuthError::SignatureError(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Inputs from Twitter's "Creating a signature" walkthrough.
    fn reference_credentials() -> Credentials {
        Credentials::new(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
        )
        .with_access_token(
            "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        )
    }

    fn reference_request() -> RequestDescription {
        RequestDescription::new(
            Method::Post,
            "https://api.twitter.com/1.1/statuses/update.json",
        )
        .with_query("include_entities", "true")
        .with_body("status", "Hello Ladies + Gentlemen, a signed OAuth request!")
    }

    fn reference_params() -> OAuthParams {
        OAuthParams::fixed(
            &reference_credentials(),
            "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
            1_318_622_958,
        )
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("hello world"), "hello%20world");
        assert_eq!(percent_encode("foo=bar&baz"), "foo%3Dbar%26baz");
        assert_eq!(percent_encode("test-value_123.txt"), "test-value_123.txt");
        assert_eq!(percent_encode("~tilde"), "~tilde");
        assert_eq!(percent_encode("a+b/c"), "a%2Bb%2Fc");
        assert_eq!(percent_encode("caf\u{e9}"), "caf%C3%A9");
    }

    #[test]
    fn test_generate_nonce() {
        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();

        assert_ne!(nonce1, nonce2);
        // 32 bytes -> 44 base64 chars with one '=' of padding removed.
        assert_eq!(nonce1.len(), 43);
        assert!(!nonce1.ends_with('='));
    }

    #[test]
    fn test_hmac_sha1_known_vector() {
        let digest = hmac_sha1("key", "The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(digest, "3nybhbi3iqa8ino29wqQcBydtNk=");
    }

    #[test]
    fn test_reference_signature_base_string() {
        let base = signature_base_string(&reference_request(), &reference_params()).unwrap();
        assert_eq!(
            base,
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1318622958%26oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26oauth_version%3D1.0%26status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        );
    }

    #[test]
    fn test_reference_signature() {
        let header = sign(
            &reference_request(),
            &reference_credentials(),
            &reference_params(),
        )
        .unwrap();

        assert_eq!(header.signature(), Some("hCtSmYh+iHYCEqBWrE7C7hYmtUk="));
        assert!(
            header
                .to_string()
                .contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\"")
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let first = sign(&reference_request(), &reference_credentials(), &reference_params())
            .unwrap()
            .to_string();
        let second = sign(&reference_request(), &reference_credentials(), &reference_params())
            .unwrap()
            .to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parameter_string_groups_keys_and_orders_values() {
        let pairs = [("b", "2"), ("a", "1"), ("a", "0")];
        assert_eq!(parameter_string(pairs), "a=0&a=1&b=2");
    }

    #[test]
    fn test_parameter_string_groups_case_variants() {
        let pairs = [("b", "1"), ("a", "2"), ("A", "9"), ("B", "0")];
        // Uppercase sorts first in the byte pass and stays first in its group.
        assert_eq!(parameter_string(pairs), "A=9&a=2&B=0&b=1");
    }

    #[test]
    fn test_parameter_string_encodes_before_sorting() {
        let pairs = [("z", "a b"), ("status", "x&y")];
        assert_eq!(parameter_string(pairs), "status=x%26y&z=a%20b");
    }

    #[test]
    fn test_multipart_signs_protocol_parameters_only() {
        let request = RequestDescription::new(
            Method::Post,
            "https://api.twitter.com/1.1/account/update_profile_image.json",
        )
        .with_body("skip_status", "true")
        .with_multipart(true);

        let base = signature_base_string(&request, &reference_params()).unwrap();
        assert!(!base.contains("skip_status"));
        assert!(base.contains("oauth_consumer_key"));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("HTTPS://API.Twitter.com:443/1.1/statuses/show.json?id=1#x").unwrap(),
            "https://api.twitter.com/1.1/statuses/show.json"
        );
        assert_eq!(
            normalize_base_url("http://localhost:8080/oauth/request_token").unwrap(),
            "http://localhost:8080/oauth/request_token"
        );
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_missing_consumer_credentials() {
        let credentials = Credentials::new("", "");
        let params = OAuthParams::fixed(&credentials, "nonce", 1);
        let result = sign(&reference_request(), &credentials, &params);
        assert!(matches!(result, Err(OAuthError::MissingConsumerCredentials)));
    }

    #[test]
    fn test_token_state_transitions() {
        let mut credentials = Credentials::new("key", "secret");
        assert_eq!(credentials.token(), None);
        assert_eq!(credentials.token_secret(), "");

        credentials.set_request_token("req", "req-secret");
        assert_eq!(credentials.token(), Some("req"));
        assert_eq!(credentials.token_secret(), "req-secret");
        assert!(!credentials.is_authorized());

        credentials.set_access_token("acc", "acc-secret");
        assert_eq!(credentials.token(), Some("acc"));
        assert_eq!(credentials.token_secret(), "acc-secret");
        assert!(credentials.is_authorized());
    }

    #[test]
    fn test_generate_includes_callback_and_token() {
        let credentials = Credentials::new("key", "secret");
        let params = OAuthParams::generate(&credentials, Some("oob")).unwrap();

        let keys: Vec<&str> = params.pairs().iter().map(|(k, _)| *k).collect();
        assert!(keys.contains(&"oauth_callback"));
        assert!(!keys.contains(&"oauth_token"));
        assert_eq!(params.signature_method, "HMAC-SHA1");
        assert_eq!(params.version, "1.0");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", reference_credentials());
        assert!(!rendered.contains("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"));
        assert!(!rendered.contains("LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE"));
    }
}
