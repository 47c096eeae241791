//! tweetwire OAuth - OAuth 1.0a signing for the Twitter API
//!
//! This crate provides:
//!
//! - **Signing**: signature base string, HMAC-SHA1 signature and the
//!   `Authorization` header for one request
//! - **Credentials**: consumer pair plus the request/access token stage of the
//!   three-legged handshake
//! - **Handshake parsing**: form-encoded `request_token` / `access_token`
//!   responses
//!
//! No HTTP happens here; the `tweetwire` crate sends what this crate signs.
//!
//! # Quick Start
//!
//! ```rust
//! use tweetwire_oauth::{Credentials, Method, OAuthParams, RequestDescription, sign};
//!
//! let credentials = Credentials::new("consumer_key", "consumer_secret")
//!     .with_access_token("access_token", "access_token_secret");
//! let request = RequestDescription::new(
//!     Method::Get,
//!     "https://api.twitter.com/1.1/statuses/home_timeline.json",
//! )
//! .with_query("count", "20");
//!
//! let params = OAuthParams::generate(&credentials, None)?;
//! let header = sign(&request, &credentials, &params)?;
//! assert!(header.to_string().starts_with("OAuth "));
//! # Ok::<(), tweetwire_oauth::OAuthError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod header;
mod oauth1;
mod token;

pub use error::*;
pub use header::*;
pub use oauth1::*;
pub use token::*;
