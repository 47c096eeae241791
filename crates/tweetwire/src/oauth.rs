//! Three-legged OAuth handshake: request token, authorize URL, access token.
//!
//! Credentials move from no token to a request token when the handshake
//! starts and from the request token to an access token once the user's
//! verifier is exchanged.

use tracing::info;
use tweetwire_oauth::{
    AccessToken, Method, RequestToken, TokenState, parse_access_token, parse_request_token,
};
use url::Url;

use crate::{
    client::{Outgoing, TwitterClient},
    error::{TwitterError, TwitterResult},
};

/// Options of the `oauth/authenticate` URL.
#[derive(Debug, Clone, Default)]
pub struct AuthUrlOptions {
    /// Where Twitter redirects after authorization; `oob` for PIN flow
    pub callback: Option<String>,

    /// Make the user log in even with an active session
    pub force_login: bool,

    /// Prefill the login form
    pub screen_name: Option<String>,
}

impl AuthUrlOptions {
    #[must_use]
    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }
}

impl TwitterClient {
    fn oauth_url(&self, endpoint: &str) -> String {
        self.build_url(&self.config.oauth_host, &self.config.oauth_root, endpoint)
    }

    /// Obtain a request token and hold it in the credentials.
    ///
    /// # Errors
    ///
    /// Transport and API errors, or [`TwitterError::OAuth`] for a malformed
    /// token response.
    pub async fn get_request_token(
        &mut self,
        callback: Option<&str>,
    ) -> TwitterResult<RequestToken> {
        let mut outgoing = Outgoing::new(Method::Post, self.oauth_url("request_token"));
        outgoing.callback = callback.map(str::to_string);

        let body = self.execute(&outgoing, false).await?.text().await?;
        let token = parse_request_token(&body)?;

        self.credentials.set_request_token(&token.token, &token.token_secret);
        info!(
            callback_confirmed = token.callback_confirmed,
            "Obtained request token"
        );
        Ok(token)
    }

    /// Start the handshake and build the URL the user must visit.
    ///
    /// Any request token left from an earlier attempt is discarded first.
    ///
    /// # Errors
    ///
    /// Same as [`get_request_token`](Self::get_request_token), and
    /// [`TwitterError::Api`] "OAuth callback not confirmed" when a callback
    /// was given but Twitter did not confirm it.
    pub async fn get_auth_url(&mut self, options: &AuthUrlOptions) -> TwitterResult<String> {
        if matches!(self.credentials.tokens(), TokenState::Request { .. }) {
            self.credentials.clear_tokens();
        }

        let token = self.get_request_token(options.callback.as_deref()).await?;
        if options.callback.is_some() && !token.callback_confirmed {
            return Err(TwitterError::api("OAuth callback not confirmed"));
        }

        let mut url = Url::parse(&self.oauth_url("authenticate"))
            .map_err(|e| TwitterError::Configuration(format!("Invalid OAuth URL: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("oauth_token", &token.token);
            if options.force_login {
                query.append_pair("force_login", "true");
            }
            if let Some(screen_name) = &options.screen_name {
                query.append_pair("screen_name", screen_name);
            }
        }

        Ok(url.into())
    }

    /// Exchange the user's verifier for an access token.
    ///
    /// Loads the authenticated user afterwards when `load_user` is set.
    ///
    /// # Errors
    ///
    /// [`TwitterError::Configuration`] without a pending request token;
    /// transport, API and token parsing errors otherwise.
    pub async fn authenticate(&mut self, verifier: &str) -> TwitterResult<AccessToken> {
        if !matches!(self.credentials.tokens(), TokenState::Request { .. }) {
            return Err(TwitterError::Configuration(
                "No request token; start with get_auth_url".into(),
            ));
        }

        let mut outgoing = Outgoing::new(Method::Post, self.oauth_url("access_token"));
        outgoing.params = vec![("oauth_verifier".into(), verifier.into())];

        let body = self.execute(&outgoing, false).await?.text().await?;
        let access = parse_access_token(&body)?;

        info!(
            user_id = ?access.user_id,
            screen_name = ?access.screen_name,
            "Obtained access token"
        );
        self.set_access_token(&access.token, &access.token_secret).await?;
        Ok(access)
    }

    /// Replace the credentials' token with an access token pair.
    ///
    /// # Errors
    ///
    /// Errors of [`verify`](Self::verify) when `load_user` is set.
    pub async fn set_access_token(&mut self, token: &str, secret: &str) -> TwitterResult<()> {
        self.credentials.set_access_token(token, secret);
        self.user = None;
        if self.config.load_user {
            self.verify().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TwitterConfig;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, header_regex, method, path},
    };

    fn test_client(mock_server: &MockServer) -> TwitterClient {
        TwitterClient::new(TwitterConfig {
            host_override: Some(mock_server.address().to_string()),
            secure: false,
            load_user: false,
            ..TwitterConfig::new("ck", "cs")
        })
        .unwrap()
    }

    async fn mount_request_token(mock_server: &MockServer, confirmed: bool) {
        Mock::given(method("POST"))
            .and(path("/oauth/request_token"))
            .and(header_regex("Authorization", "oauth_callback="))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "oauth_token=req&oauth_token_secret=reqsecret&oauth_callback_confirmed={confirmed}"
            )))
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_auth_url() {
        let mock_server = MockServer::start().await;
        mount_request_token(&mock_server, true).await;

        let mut client = test_client(&mock_server);
        let options = AuthUrlOptions {
            force_login: true,
            screen_name: Some("pony".into()),
            ..AuthUrlOptions::default()
        }
        .with_callback("https://example.com/cb");

        let url = client.get_auth_url(&options).await.unwrap();
        assert!(url.ends_with(
            "/oauth/authenticate?oauth_token=req&force_login=true&screen_name=pony"
        ));
        assert!(matches!(
            client.credentials().tokens(),
            TokenState::Request { token, .. } if token == "req"
        ));
    }

    #[tokio::test]
    async fn test_unconfirmed_callback() {
        let mock_server = MockServer::start().await;
        mount_request_token(&mock_server, false).await;

        let mut client = test_client(&mock_server);
        let err = client
            .get_auth_url(&AuthUrlOptions::default().with_callback("oob"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TwitterError::Api { code: None, ref description, .. } if description == "OAuth callback not confirmed"
        ));
    }

    #[tokio::test]
    async fn test_authenticate_moves_to_access_token() {
        let mock_server = MockServer::start().await;
        mount_request_token(&mock_server, true).await;

        Mock::given(method("POST"))
            .and(path("/oauth/access_token"))
            .and(body_string_contains("oauth_verifier=1234"))
            .and(header_regex("Authorization", "oauth_token=\"req\""))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "oauth_token=acc&oauth_token_secret=accsecret&user_id=42&screen_name=pony",
            ))
            .mount(&mock_server)
            .await;

        let mut client = test_client(&mock_server);
        assert!(matches!(client.credentials().tokens(), TokenState::None));

        client
            .get_auth_url(&AuthUrlOptions::default().with_callback("oob"))
            .await
            .unwrap();
        let access = client.authenticate("1234").await.unwrap();

        assert_eq!(access.user_id.as_deref(), Some("42"));
        assert_eq!(access.screen_name.as_deref(), Some("pony"));
        assert!(client.credentials().is_authorized());
        assert_eq!(client.credentials().token(), Some("acc"));
    }

    #[tokio::test]
    async fn test_authenticate_without_request_token() {
        let mock_server = MockServer::start().await;
        let mut client = test_client(&mock_server);

        let err = client.authenticate("1234").await.unwrap_err();
        assert!(matches!(err, TwitterError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_malformed_token_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/request_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("nothing useful"))
            .mount(&mock_server)
            .await;

        let mut client = test_client(&mock_server);
        let err = client.get_request_token(None).await.unwrap_err();
        assert!(matches!(err, TwitterError::OAuth(_)));
    }
}
