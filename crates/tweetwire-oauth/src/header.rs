//! `Authorization: OAuth ...` header encoding and decoding.

use std::fmt;

use percent_encoding::percent_decode_str;

use crate::{OAuthError, OAuthResult, percent_encode};

const SCHEME: &str = "OAuth";

/// Ordered OAuth protocol fields of an `Authorization` header, unencoded.
///
/// Renders as `OAuth k1="v1", k2="v2"` with every key and value
/// percent-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationHeader {
    params: Vec<(String, String)>,
}

impl AuthorizationHeader {
    /// Build a header from unencoded fields, keeping their order.
    pub fn from_params<K, V>(params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Decode a header value produced by [`Display`](fmt::Display).
    ///
    /// # Errors
    ///
    /// [`OAuthError::MalformedHeader`] if the scheme is not `OAuth`, a field is
    /// not `key="value"`, or a value is not valid percent-encoded UTF-8.
    pub fn parse(value: &str) -> OAuthResult<Self> {
        let value = value.trim();
        let rest = value
            .get(..SCHEME.len())
            .filter(|scheme| scheme.eq_ignore_ascii_case(SCHEME))
            .map(|_| value[SCHEME.len()..].trim_start())
            .ok_or_else(|| OAuthError::MalformedHeader(format!("missing {SCHEME} scheme")))?;

        let mut params = Vec::new();
        for field in rest.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            let (key, raw) = field
                .split_once('=')
                .ok_or_else(|| OAuthError::MalformedHeader(format!("field without '=': {field}")))?;
            let quoted = raw
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .ok_or_else(|| OAuthError::MalformedHeader(format!("unquoted value: {field}")))?;

            params.push((decode(key.trim())?, decode(quoted)?));
        }

        Ok(Self { params })
    }

    /// Fields in header order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Look up a field by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `oauth_signature` field, base64 as computed.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.get("oauth_signature")
    }

    /// A copy with `oauth_signature` removed.
    #[must_use]
    pub fn without_signature(&self) -> Self {
        Self {
            params: self
                .params
                .iter()
                .filter(|(k, _)| k != "oauth_signature")
                .cloned()
                .collect(),
        }
    }

    /// Field keys in header order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(k, _)| k.as_str())
    }
}

impl fmt::Display for AuthorizationHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{SCHEME} {fields}")
    }
}

fn decode(s: &str) -> OAuthResult<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| OAuthError::MalformedHeader(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{Credentials, Method, OAuthParams, RequestDescription, sign};

    #[test]
    fn test_display_format() {
        let header = AuthorizationHeader::from_params([
            ("oauth_consumer_key", "key"),
            ("oauth_signature", "a+b/c="),
        ]);
        assert_eq!(
            header.to_string(),
            "OAuth oauth_consumer_key=\"key\", oauth_signature=\"a%2Bb%2Fc%3D\""
        );
    }

    #[test]
    fn test_parse_decodes_values() {
        let header =
            AuthorizationHeader::parse("OAuth oauth_nonce=\"abc\", oauth_signature=\"a%2Bb%3D\"")
                .unwrap();
        assert_eq!(header.get("oauth_nonce"), Some("abc"));
        assert_eq!(header.signature(), Some("a+b="));
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(AuthorizationHeader::parse("Bearer abc").is_err());
        assert!(AuthorizationHeader::parse("OAuth oauth_nonce=abc").is_err());
        assert!(AuthorizationHeader::parse("OAuth oauth_nonce").is_err());
    }

    #[test]
    fn test_round_trip_preserves_key_set() {
        let credentials = Credentials::new("ck", "cs").with_access_token("at", "as");
        let params = OAuthParams::fixed(&credentials, "n0nce", 1_700_000_000)
            .with_callback("https://example.com/cb?x=1");
        let request = RequestDescription::new(Method::Get, "https://api.twitter.com/1.1/x.json");

        let header = sign(&request, &credentials, &params).unwrap();
        let decoded = AuthorizationHeader::parse(&header.to_string()).unwrap();
        assert_eq!(decoded, header);

        let unsigned = header.without_signature();
        let before: BTreeSet<&str> = unsigned.keys().collect();
        let reencoded =
            AuthorizationHeader::parse(&decoded.without_signature().to_string()).unwrap();
        let after: BTreeSet<&str> = reencoded.keys().collect();
        assert_eq!(before, after);
        assert_eq!(reencoded.get("oauth_callback"), Some("https://example.com/cb?x=1"));
    }
}
