//! n8n REST client with authentication, retry and error classification.

mod client;
pub mod retry;
pub mod url;

pub use client::{ApiClient, ClientOptions, DEFAULT_TIMEOUT, Discard, MAX_PAGES};
pub use retry::{RetryPolicy, is_retryable_status, is_transient_error, is_transient_message};
pub use url::{API_PREFIX, normalize_base_url, resolve};
