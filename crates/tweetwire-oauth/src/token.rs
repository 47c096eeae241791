//! Token endpoint responses of the three-legged handshake.
//!
//! Both `oauth/request_token` and `oauth/access_token` answer with an
//! `application/x-www-form-urlencoded` body rather than JSON.

use std::collections::HashMap;

use crate::{OAuthError, OAuthResult};

/// Temporary credentials from `oauth/request_token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    /// OAuth token.
    pub token: String,
    /// OAuth token secret.
    pub token_secret: String,
    /// Whether the callback was confirmed.
    pub callback_confirmed: bool,
}

/// Token credentials from `oauth/access_token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// OAuth token.
    pub token: String,
    /// OAuth token secret.
    pub token_secret: String,
    /// User ID (if provided).
    pub user_id: Option<String>,
    /// Screen name (if provided).
    pub screen_name: Option<String>,
}

/// Parse a request token response.
pub fn parse_request_token(body: &str) -> OAuthResult<RequestToken> {
    let mut params = parse_form(body)?;
    let (token, token_secret) = take_token_pair(&mut params)?;

    Ok(RequestToken {
        token,
        token_secret,
        callback_confirmed: params
            .get("oauth_callback_confirmed")
            .is_some_and(|v| v == "true"),
    })
}

/// Parse an access token response.
pub fn parse_access_token(body: &str) -> OAuthResult<AccessToken> {
    let mut params = parse_form(body)?;
    let (token, token_secret) = take_token_pair(&mut params)?;

    Ok(AccessToken {
        token,
        token_secret,
        user_id: params.remove("user_id"),
        screen_name: params.remove("screen_name"),
    })
}

fn parse_form(body: &str) -> OAuthResult<HashMap<String, String>> {
    serde_urlencoded::from_str(body.trim())
        .map_err(|e| OAuthError::InvalidTokenResponse(e.to_string()))
}

fn take_token_pair(params: &mut HashMap<String, String>) -> OAuthResult<(String, String)> {
    let token = params
        .remove("oauth_token")
        .ok_or_else(|| OAuthError::InvalidTokenResponse("Missing oauth_token".into()))?;
    let token_secret = params
        .remove("oauth_token_secret")
        .ok_or_else(|| OAuthError::InvalidTokenResponse("Missing oauth_token_secret".into()))?;
    Ok((token, token_secret))
}
