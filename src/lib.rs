//! Resilient client for the n8n REST API.
//!
//! [`ApiClient`] wraps every call with authentication, JSON encoding,
//! retry with exponential backoff and structured error reporting. Callers
//! hand it opaque `serde` payloads and get either a decoded response or an
//! error they can inspect with [`error::api_error`] and
//! [`error::client_error`].

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod pagination;
pub mod runtime;

pub use auth::Auth;
pub use error::{ApiError, ClientError};
pub use http::{ApiClient, ClientOptions, Discard, RetryPolicy};
pub use logger::{LogLogger, Logger, MemoryLogger};
pub use pagination::PageInfo;
