//! Retry policy and transient-failure classification.

use reqwest::StatusCode;
use std::time::Duration;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Default upper bound for a single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Statuses worth another attempt.
pub const RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Error text fragments that mark a transport failure as transient.
const TRANSIENT_PATTERNS: [&str; 6] = [
    "timeout",
    "timed out",
    "connection refused",
    "connection reset",
    "network unreachable",
    "network is unreachable",
];

/// Exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Returns the default policy if any field is zero.
    pub fn or_default(self) -> Self {
        if self.max_retries == 0 || self.base_delay.is_zero() || self.max_delay.is_zero() {
            Self::default()
        } else {
            self
        }
    }

    /// Total number of attempts, initial try included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after the failed attempt `attempt` (0-based):
    /// `min(base_delay * 2^attempt, max_delay)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        1u32.checked_shl(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Returns true if the status is worth retrying.
pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Returns true if a transport error looks transient.
///
/// The whole source chain is inspected since reqwest keeps the io error
/// ("Connection refused", "connection reset by peer") a few levels down.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() {
        return true;
    }
    is_transient_message(&error_chain_text(error))
}

/// Returns true if the message contains one of the transient patterns.
pub fn is_transient_message(message: &str) -> bool {
    let message = message.to_lowercase();
    TRANSIENT_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

fn error_chain_text(error: &(dyn std::error::Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
