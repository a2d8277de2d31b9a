//! Connection settings gathered from explicit values and the environment.
//!
//! Explicit values (CLI flags, or whatever the embedding layer passes in)
//! always win over environment variables. Empty strings count as unset.

use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::auth::Auth;
use crate::error::ClientError;
use crate::http::ClientOptions;
use crate::runtime::Runtime;

pub const ENV_BASE_URL: &str = "N8N_BASE_URL";
pub const ENV_API_KEY: &str = "N8N_API_KEY";
pub const ENV_EMAIL: &str = "N8N_EMAIL";
pub const ENV_PASSWORD: &str = "N8N_PASSWORD";
pub const ENV_USE_SESSION_AUTH: &str = "N8N_USE_SESSION_AUTH";
pub const ENV_COOKIE_FILE: &str = "N8N_COOKIE_FILE";
pub const ENV_INSECURE_SKIP_VERIFY: &str = "N8N_INSECURE_SKIP_VERIFY";

/// Values supplied explicitly by the caller.
#[derive(Default, Clone)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub use_session_auth: Option<bool>,
    pub cookie_file: Option<PathBuf>,
    pub insecure_skip_verify: Option<bool>,
}

/// Merges `overrides` with the environment into client options.
///
/// Authentication is picked in this order: session auth when enabled, then
/// an API key, then email and password. When none is available the options
/// carry no auth and client construction reports it.
#[tracing::instrument(skip_all)]
pub fn resolve_options<R: Runtime + ?Sized>(
    runtime: &R,
    overrides: &ConfigOverrides,
) -> Result<ClientOptions> {
    let base_url = explicit_or_env(runtime, &overrides.base_url, ENV_BASE_URL).ok_or_else(|| {
        ClientError::Config(format!(
            "base URL is required (use --base-url or set {})",
            ENV_BASE_URL
        ))
    })?;

    let api_key = explicit_or_env(runtime, &overrides.api_key, ENV_API_KEY);
    let email = explicit_or_env(runtime, &overrides.email, ENV_EMAIL);
    let password = explicit_or_env(runtime, &overrides.password, ENV_PASSWORD);
    let cookie_file = overrides
        .cookie_file
        .clone()
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| env_value(runtime, ENV_COOKIE_FILE).map(PathBuf::from));

    let use_session_auth = match overrides.use_session_auth {
        Some(flag) => flag,
        None => env_flag(runtime, ENV_USE_SESSION_AUTH)?.unwrap_or(false),
    };
    let insecure_skip_verify = match overrides.insecure_skip_verify {
        Some(flag) => flag,
        None => env_flag(runtime, ENV_INSECURE_SKIP_VERIFY)?.unwrap_or(false),
    };

    let auth = if use_session_auth {
        Some(Auth::session(cookie_file))
    } else if let Some(key) = api_key {
        Some(Auth::api_key(key))
    } else if let (Some(email), Some(password)) = (email, password) {
        Some(Auth::basic(email, password))
    } else {
        None
    };

    debug!(
        "Resolved configuration for {} ({} auth)",
        base_url,
        auth.as_ref().map_or("no", Auth::kind)
    );

    Ok(ClientOptions {
        base_url,
        auth,
        insecure_skip_verify,
        ..ClientOptions::default()
    })
}

fn explicit_or_env<R: Runtime + ?Sized>(
    runtime: &R,
    explicit: &Option<String>,
    key: &str,
) -> Option<String> {
    explicit
        .clone()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| env_value(runtime, key))
}

fn env_value<R: Runtime + ?Sized>(runtime: &R, key: &str) -> Option<String> {
    runtime.env_var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag<R: Runtime + ?Sized>(runtime: &R, key: &str) -> Result<Option<bool>> {
    let Some(value) = env_value(runtime, key) else {
        return Ok(None);
    };
    match parse_flag(&value) {
        Some(flag) => Ok(Some(flag)),
        None => Err(ClientError::Config(format!(
            "{} must be a boolean (true/false, 1/0, yes/no, on/off), got {:?}",
            key, value
        ))
        .into()),
    }
}

/// Parses the boolean spellings accepted in environment variables.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
