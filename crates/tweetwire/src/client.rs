//! Twitter REST and streaming client.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::{StreamExt, stream::BoxStream};
use reqwest::{
    Client, Response, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE},
    multipart::{Form, Part},
};
use serde_json::Value;
use tracing::{debug, info, instrument};
use tweetwire_oauth::{Credentials, Method, OAuthParams, RequestDescription, percent_encode, sign};

use crate::{
    catalog::{BuiltinCatalog, Endpoint, EndpointCatalog},
    config::{RateLimitInfo, TwitterConfig},
    error::{TwitterError, TwitterResult},
    model::Model,
    params::{CallArgs, FilePart, prepare},
    stream::{
        BufferedOutcome, BufferedStreamProcessor, LineReader, StreamOutcome, StreamProcessor,
        process_stream,
    },
    types::{Status, User},
};

/// Live streaming response, read line by line.
pub type ResponseStream = LineReader<BoxStream<'static, reqwest::Result<Bytes>>>;

/// Body of a response whose endpoint has no model.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// JSON if the text parses, text otherwise.
    #[must_use]
    pub fn parse(text: String) -> Self {
        serde_json::from_str(&text).map_or(Self::Text(text), Self::Json)
    }

    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

/// Result of [`TwitterClient::call`].
#[derive(Debug, Clone)]
pub enum ApiResponse {
    /// Decoded with the endpoint's model tag
    Model(Model),
    /// Endpoint has no model
    Raw(ResponseBody),
}

impl ApiResponse {
    #[must_use]
    pub fn into_model(self) -> Option<Model> {
        match self {
            Self::Model(model) => Some(model),
            Self::Raw(_) => None,
        }
    }

    #[must_use]
    pub fn into_raw(self) -> Option<ResponseBody> {
        match self {
            Self::Model(_) => None,
            Self::Raw(body) => Some(body),
        }
    }
}

/// One request before signing.
#[derive(Debug, Clone)]
pub(crate) struct Outgoing {
    pub method: Method,
    /// Scheme, host and path
    pub url: String,
    /// Query parameters for GET, form fields otherwise
    pub params: Vec<(String, String)>,
    pub files: Vec<(String, FilePart)>,
    /// `oauth_callback`, only when starting the handshake
    pub callback: Option<String>,
}

impl Outgoing {
    pub fn new(method: Method, url: String) -> Self {
        Self {
            method,
            url,
            params: Vec::new(),
            files: Vec::new(),
            callback: None,
        }
    }

    const fn params_in_query(&self) -> bool {
        matches!(self.method, Method::Get | Method::Delete)
    }

    fn description(&self) -> RequestDescription {
        let mut description = RequestDescription::new(self.method, self.url.clone())
            .with_multipart(!self.files.is_empty());
        if self.params_in_query() {
            description.query.clone_from(&self.params);
        } else {
            description.body.clone_from(&self.params);
        }
        description
    }

    fn full_url(&self) -> String {
        if self.params_in_query() && !self.params.is_empty() {
            format!("{}?{}", self.url, encode_pairs(&self.params))
        } else {
            self.url.clone()
        }
    }

    fn multipart_form(&self) -> TwitterResult<Form> {
        let mut form = Form::new();
        for (key, value) in &self.params {
            form = form.text(key.clone(), value.clone());
        }
        for (key, file) in &self.files {
            let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.file_name.clone());
            if let Some(mime) = &file.mime {
                part = part.mime_str(mime)?;
            }
            form = form.part(key.clone(), part);
        }
        Ok(form)
    }
}

/// `k=v&k=v` with the same encoding used for signing.
fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

const fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Twitter API client.
///
/// Signs every request with OAuth 1.0a, dispatches logical calls through an
/// [`EndpointCatalog`] and consumes streaming endpoints. Nothing is retried;
/// see [`TwitterError::is_retryable`].
pub struct TwitterClient {
    pub(crate) http: Client,
    pub(crate) config: TwitterConfig,
    pub(crate) credentials: Credentials,
    pub(crate) catalog: Arc<dyn EndpointCatalog>,
    pub(crate) user: Option<User>,
}

impl TwitterClient {
    /// Create a client from configuration. No request is made.
    ///
    /// # Errors
    ///
    /// [`TwitterError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: TwitterConfig) -> TwitterResult<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        let mut credentials = Credentials::new(&config.consumer_key, &config.consumer_secret);
        if let (Some(token), Some(secret)) = (&config.access_token, &config.access_token_secret) {
            credentials.set_access_token(token, secret);
        }

        Ok(Self {
            http,
            config,
            credentials,
            catalog: Arc::new(BuiltinCatalog),
            user: None,
        })
    }

    /// Create a client and, when configured to, load the authenticated user.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new) and [`verify`](Self::verify).
    pub async fn connect(config: TwitterConfig) -> TwitterResult<Self> {
        let mut client = Self::new(config)?;
        if client.config.load_user && client.credentials.is_authorized() {
            client.verify().await?;
        }
        Ok(client)
    }

    /// Replace the endpoint catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: impl EndpointCatalog + 'static) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &TwitterConfig {
        &self.config
    }

    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The authenticated user, once loaded.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Load the authenticated user through `verify_credentials` and cache it.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn verify(&mut self) -> TwitterResult<&User> {
        let user = self
            .call("verify_credentials", CallArgs::new())
            .await?
            .into_model()
            .and_then(Model::into_user)
            .ok_or_else(|| TwitterError::api("verify_credentials returned no user"))?;

        info!(screen_name = %user.screen_name, "Loaded authenticated user");
        Ok(self.user.insert(user))
    }

    /// Call a REST endpoint by its catalog name.
    ///
    /// # Errors
    ///
    /// [`TwitterError::Parameter`] for an unknown or streaming endpoint and
    /// for arguments that do not fit it; otherwise signing, transport and API
    /// errors.
    #[instrument(skip(self, args))]
    pub async fn call(&self, name: &str, args: CallArgs) -> TwitterResult<ApiResponse> {
        let endpoint = self.endpoint(name)?;
        if endpoint.streaming {
            return Err(TwitterError::Parameter(format!(
                "'{name}' is a streaming endpoint; consume it with stream()"
            )));
        }

        let outgoing = self.outgoing(endpoint, args)?;
        let response = self.execute(&outgoing, false).await?;
        let text = response.text().await?;

        match endpoint.model {
            Some(tag) => {
                let value: Value = serde_json::from_str(&text)?;
                Ok(ApiResponse::Model(tag.decode(value)?))
            }
            None => Ok(ApiResponse::Raw(ResponseBody::parse(text))),
        }
    }

    /// Open a streaming endpoint without consuming it.
    ///
    /// # Errors
    ///
    /// [`TwitterError::Parameter`] if `name` is not a streaming endpoint;
    /// otherwise signing, transport and API errors.
    #[instrument(skip(self, args))]
    pub async fn open_stream(&self, name: &str, args: CallArgs) -> TwitterResult<ResponseStream> {
        let endpoint = self.endpoint(name)?;
        if !endpoint.streaming {
            return Err(TwitterError::Parameter(format!(
                "'{name}' is not a streaming endpoint; use call()"
            )));
        }

        let outgoing = self.outgoing(endpoint, args)?;
        let response = self.execute(&outgoing, true).await?;
        info!(url = %outgoing.url, "Stream connected");

        Ok(LineReader::new(
            response.bytes_stream().boxed(),
            self.config.stream_read_timeout,
        ))
    }

    /// Consume a streaming endpoint, dispatching each entity inline.
    ///
    /// # Errors
    ///
    /// Same as [`open_stream`](Self::open_stream), plus read errors.
    pub async fn stream<P>(
        &self,
        name: &str,
        args: CallArgs,
        processor: &mut P,
    ) -> TwitterResult<StreamOutcome>
    where
        P: StreamProcessor + ?Sized,
    {
        let mut reader = self.open_stream(name, args).await?;
        process_stream(&mut reader, processor).await
    }

    /// Consume a streaming endpoint through a bounded queue of
    /// `buffer_capacity` entities handled by a separate task.
    ///
    /// # Errors
    ///
    /// Same as [`open_stream`](Self::open_stream), plus read errors.
    pub async fn stream_buffered<P>(
        &self,
        name: &str,
        args: CallArgs,
        processor: P,
    ) -> TwitterResult<BufferedOutcome<P>>
    where
        P: StreamProcessor + 'static,
    {
        let mut reader = self.open_stream(name, args).await?;
        BufferedStreamProcessor::with_capacity(processor, self.config.buffer_capacity)
            .run(&mut reader)
            .await
    }

    /// Upload each file with `upload_media`, then post a status carrying the
    /// returned media IDs.
    ///
    /// # Errors
    ///
    /// Any error of the uploads or the status update.
    pub async fn update_status_with_media(
        &self,
        status: &str,
        media: Vec<FilePart>,
        args: CallArgs,
    ) -> TwitterResult<Status> {
        let mut media_ids = Vec::with_capacity(media.len());
        for file in media {
            let uploaded = self
                .call("upload_media", CallArgs::new().param("media", file))
                .await?;
            let media_id = uploaded
                .into_raw()
                .as_ref()
                .and_then(ResponseBody::as_json)
                .and_then(|v| {
                    v.get("media_id_string")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .or_else(|| v.get("media_id").and_then(Value::as_u64).map(|id| id.to_string()))
                })
                .ok_or_else(|| TwitterError::api("Media upload returned no media_id"))?;
            debug!(media_id = %media_id, "Uploaded media");
            media_ids.push(media_id);
        }

        self.call(
            "update_status",
            args.param("status", status).param("media_ids", media_ids),
        )
        .await?
        .into_model()
        .and_then(Model::into_status)
        .ok_or_else(|| TwitterError::api("update_status returned no status"))
    }

    fn endpoint(&self, name: &str) -> TwitterResult<&Endpoint> {
        self.catalog.lookup(name).ok_or_else(|| {
            TwitterError::Parameter(format!("API endpoint for method '{name}' not found"))
        })
    }

    fn outgoing(&self, endpoint: &Endpoint, args: CallArgs) -> TwitterResult<Outgoing> {
        let prepared = prepare(endpoint, args)?;
        let path = endpoint.expand_path(&prepared.url_values);
        let host = endpoint.host.unwrap_or(self.config.api_host.as_str());

        let mut outgoing = Outgoing::new(
            endpoint.method,
            self.build_url(host, &self.config.api_root, &path),
        );
        outgoing.params = prepared.params;
        outgoing.files = prepared.files;
        Ok(outgoing)
    }

    pub(crate) fn build_url(&self, host: &str, root: &str, path: &str) -> String {
        let host = self.config.host_override.as_deref().unwrap_or(host);
        format!("{}://{host}{root}{path}", self.config.scheme())
    }

    /// Sign and send one request; non-success statuses become errors.
    pub(crate) async fn execute(&self, outgoing: &Outgoing, streaming: bool) -> TwitterResult<Response> {
        let params = OAuthParams::generate(&self.credentials, outgoing.callback.as_deref())?;
        let header = sign(&outgoing.description(), &self.credentials, &params)?;

        debug!(
            method = %outgoing.method,
            url = %outgoing.url,
            params = outgoing.params.len(),
            files = outgoing.files.len(),
            streaming,
            "Sending Twitter API request"
        );

        let mut request = self
            .http
            .request(http_method(outgoing.method), outgoing.full_url())
            .header(AUTHORIZATION, header.to_string());

        if !outgoing.files.is_empty() {
            request = request.multipart(outgoing.multipart_form()?);
        } else if !outgoing.params_in_query() && !outgoing.params.is_empty() {
            request = request
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encode_pairs(&outgoing.params));
        }

        if !streaming {
            if let Some(timeout) = self.config.timeout {
                request = request.timeout(timeout);
            }
        }

        let response = request.send().await?;
        let rate_limit = RateLimitInfo::from_headers(response.headers());
        if rate_limit.is_exhausted() {
            debug!(reset = ?rate_limit.reset, "Rate limit exhausted");
        }

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response, &rate_limit).await)
        }
    }
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("user", &self.user.as_ref().map(|u| &u.screen_name))
            .finish_non_exhaustive()
    }
}

/// Build the error for a non-success response.
async fn api_error(response: Response, rate_limit: &RateLimitInfo) -> TwitterError {
    let status = response.status();
    let status_line = status_line(&response);
    let body = response.text().await.ok().filter(|text| !text.is_empty());

    let retry_after = (status == StatusCode::TOO_MANY_REQUESTS || rate_limit.is_exhausted())
        .then(|| rate_limit.time_until_reset())
        .flatten()
        .map(|d| d.as_secs());

    interpret_error(status.as_u16(), status_line, body, retry_after)
}

/// Reason phrase from the legacy `status` header, the canonical reason, or
/// `Unknown Error`.
fn status_line(response: &Response) -> String {
    response
        .headers()
        .get("status")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split_whitespace().skip(1).collect::<Vec<_>>().join(" "))
        .filter(|reason| !reason.is_empty())
        .or_else(|| response.status().canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Unknown Error".into())
}

/// Interpret an error body.
///
/// `{"errors": [{"code", "message"}, ...]}` yields the first error's code and
/// message; `{"errors": "text"}` yields the text with no code; anything else
/// falls back to the HTTP status and its reason phrase.
#[must_use]
pub fn interpret_error(
    status: u16,
    status_line: String,
    body: Option<String>,
    retry_after: Option<u64>,
) -> TwitterError {
    let envelope = body
        .as_deref()
        .and_then(|text| serde_json::from_str::<Value>(text).ok());

    let first_error = |errors: &[Value]| {
        let first = errors.first()?;
        Some((
            first.get("code")?.as_i64()?,
            first.get("message")?.as_str()?.to_string(),
        ))
    };

    let (code, description) = match envelope.as_ref().and_then(|v| v.get("errors")) {
        Some(Value::String(message)) => (None, message.clone()),
        Some(Value::Array(errors)) => match first_error(errors) {
            Some((code, message)) => (Some(code), message),
            None => (Some(i64::from(status)), status_line),
        },
        _ => (Some(i64::from(status)), status_line),
    };

    debug!(status, ?code, %description, "Twitter API error");

    TwitterError::Api {
        code,
        description,
        body,
        retry_after,
    }
}
