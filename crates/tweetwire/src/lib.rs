//! tweetwire - Twitter REST and Streaming API client
//!
//! This crate provides:
//!
//! - **Dispatch**: named API calls resolved through an endpoint catalog,
//!   validated, OAuth-signed and decoded into typed models
//! - **Handshake**: three-legged OAuth (request token, authorize URL, access
//!   token)
//! - **Streaming**: newline-delimited JSON classified into [`StreamEntity`]
//!   values and handed to a [`StreamProcessor`], either inline or through a
//!   bounded queue ([`BufferedStreamProcessor`])
//!
//! Signing lives in `tweetwire-oauth`; its public types are re-exported here.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tweetwire::{CallArgs, TwitterClient, TwitterConfig};
//!
//! # async fn run() -> tweetwire::TwitterResult<()> {
//! let config = TwitterConfig::new("consumer_key", "consumer_secret")
//!     .with_access_token("access_token", "access_token_secret");
//! let client = TwitterClient::connect(config).await?;
//!
//! let timeline = client
//!     .call("home_timeline", CallArgs::new().param("count", 20))
//!     .await?;
//! for status in timeline.into_model().and_then(|m| m.into_statuses()).unwrap_or_default() {
//!     println!("{}: {}", status.id, status.text);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod catalog;
mod client;
mod config;
mod error;
mod model;
mod oauth;
mod params;
mod stream;
mod telemetry;
mod types;

pub use catalog::{BuiltinCatalog, Endpoint, EndpointCatalog};
pub use client::{ApiResponse, ResponseBody, ResponseStream, TwitterClient, interpret_error};
pub use config::{DEFAULT_BUFFER_CAPACITY, RateLimitInfo, TwitterConfig};
pub use error::{TwitterError, TwitterResult};
pub use model::{Model, ModelTag};
pub use oauth::AuthUrlOptions;
pub use params::{CallArgs, FILE_PARAMS, FilePart, ParamValue, PreparedCall, prepare};
pub use stream::*;
pub use telemetry::{LoggingConfig, init_logging};
pub use types::*;

pub use tweetwire_oauth::{
    AccessToken, AuthorizationHeader, Credentials, Method, OAuthError, RequestToken, TokenState,
};
