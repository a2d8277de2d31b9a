//! Authentication strategies for the n8n REST API.

pub mod cookie;

use anyhow::Result;
use reqwest::RequestBuilder;
use reqwest::cookie::Jar;
use reqwest::header::HeaderValue;
use std::path::PathBuf;
use std::sync::Arc;

use crate::runtime::Runtime;

pub use cookie::{Cookie, cookie_jar, load_cookie_file, parse_cookies, validate_cookie_path};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-N8N-API-KEY";

/// How requests prove who they are.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// Sends the key in the `X-N8N-API-KEY` header
    ApiKey(String),
    /// HTTP basic authentication with the user's email and password
    Basic { email: String, password: String },
    /// Relies on session cookies, optionally seeded from a Netscape cookie file
    Session { cookie_file: Option<PathBuf> },
}

impl Auth {
    pub fn api_key(key: impl Into<String>) -> Self {
        Auth::ApiKey(key.into())
    }

    pub fn basic(email: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn session(cookie_file: Option<PathBuf>) -> Self {
        Auth::Session { cookie_file }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Auth::ApiKey(_) => "api-key",
            Auth::Basic { .. } => "basic",
            Auth::Session { .. } => "session",
        }
    }

    /// Adds credentials to an outgoing request.
    ///
    /// The session variant leaves the request alone; its cookies come from
    /// the transport's cookie store.
    pub fn decorate(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::ApiKey(key) => match HeaderValue::from_str(key) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    request.header(API_KEY_HEADER, value)
                }
                // Let reqwest report the invalid header when the request is built
                Err(_) => request.header(API_KEY_HEADER, key.as_str()),
            },
            Auth::Basic { email, password } => request.basic_auth(email, Some(password)),
            Auth::Session { .. } => request,
        }
    }

    /// Loads the cookie store for the session variant.
    ///
    /// Returns `None` for header-based strategies. A session without a
    /// cookie file gets an empty store that still keeps cookies set by the
    /// server.
    pub(crate) fn cookie_store<R: Runtime + ?Sized>(&self, runtime: &R) -> Result<Option<Arc<Jar>>> {
        match self {
            Auth::Session {
                cookie_file: Some(path),
            } => {
                let cookies = load_cookie_file(runtime, path)?;
                Ok(Some(cookie_jar(&cookies)))
            }
            Auth::Session { cookie_file: None } => Ok(Some(Arc::new(Jar::default()))),
            _ => Ok(None),
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::ApiKey(_) => f.debug_tuple("ApiKey").field(&"***").finish(),
            Auth::Basic { email, .. } => f
                .debug_struct("Basic")
                .field("email", email)
                .field("password", &"***")
                .finish(),
            Auth::Session { cookie_file } => f
                .debug_struct("Session")
                .field("cookie_file", cookie_file)
                .finish(),
        }
    }
}
