//! Error types surfaced by the API client.
//!
//! Every fallible operation returns [`anyhow::Result`]. The typed errors
//! below travel inside the `anyhow::Error` and can be recovered with
//! `downcast_ref`, the same way callers tell a terminal HTTP failure from a
//! network hiccup.

use reqwest::StatusCode;
use serde::Deserialize;

/// Error returned by the remote platform for a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    pub details: Option<String>,
}

/// Error body shape used by the platform: `{"code", "message", "details"}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    code: i64,
    message: String,
    #[serde(default)]
    details: Option<String>,
}

impl ApiError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Builds the error for a failed response.
    ///
    /// The body is parsed as an error envelope when possible. Otherwise the
    /// raw body (or the canonical reason when the body is blank) becomes the
    /// message. A missing or out-of-range `code` falls back to the HTTP status.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => {
                let code = u16::try_from(envelope.code)
                    .ok()
                    .filter(|c| *c != 0)
                    .unwrap_or_else(|| status.as_u16());
                Self {
                    code,
                    message: envelope.message,
                    details: envelope.details.filter(|d| !d.is_empty()),
                }
            }
            Err(_) => {
                let trimmed = body.trim();
                let message = if trimmed.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                } else {
                    trimmed.to_string()
                };
                Self::new(status.as_u16(), message)
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == StatusCode::NOT_FOUND.as_u16()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code == StatusCode::UNAUTHORIZED.as_u16() || self.code == StatusCode::FORBIDDEN.as_u16()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API error {}: {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        if self.is_unauthorized() {
            write!(f, ". Check the API key, credentials or session cookie.")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Failures raised by the client itself rather than by the remote platform.
#[derive(Debug)]
pub enum ClientError {
    /// Invalid or missing configuration, detected at construction
    Config(String),
    /// Request body could not be encoded as JSON
    Serialization(serde_json::Error),
    /// Network-level failure (DNS, connect, timeout)
    Transport(reqwest::Error),
    /// Response body was not valid JSON for the requested target
    Deserialization(serde_json::Error),
    /// Retry loop completed without producing a result
    RetriesExhausted { attempts: u32 },
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ClientError::Serialization(e) => write!(f, "Failed to encode request body: {}", e),
            ClientError::Transport(e) => write!(f, "Request failed: {}", e),
            ClientError::Deserialization(e) => {
                write!(f, "Failed to decode response body: {}", e)
            }
            ClientError::RetriesExhausted { attempts } => {
                write!(f, "Max retries exceeded after {} attempts", attempts)
            }
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Serialization(e) | ClientError::Deserialization(e) => Some(e),
            ClientError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Returns the structured API error carried by `err`, if any.
pub fn api_error(err: &anyhow::Error) -> Option<&ApiError> {
    err.downcast_ref::<ApiError>()
}

/// Returns the client-side error carried by `err`, if any.
pub fn client_error(err: &anyhow::Error) -> Option<&ClientError> {
    err.downcast_ref::<ClientError>()
}
