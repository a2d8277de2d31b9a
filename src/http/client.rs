//! API client with built-in authentication, retry and error handling.

use anyhow::Result;
use log::{debug, warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::retry::{RetryPolicy, is_retryable_status, is_transient_error};
use super::url::{normalize_base_url, resolve};
use crate::auth::Auth;
use crate::error::{ApiError, ClientError};
use crate::logger::{LogLogger, Logger};
use crate::pagination::PageInfo;
use crate::runtime::{RealRuntime, Runtime};

/// Per-attempt timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on pages fetched by [`ApiClient::list_all`].
pub const MAX_PAGES: usize = 100;

/// Response target for calls whose body is not needed.
pub type Discard = serde::de::IgnoredAny;

const USER_AGENT: &str = concat!("n8n-client/", env!("CARGO_PKG_VERSION"));

/// Everything needed to build an [`ApiClient`].
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub base_url: String,
    pub auth: Option<Auth>,
    pub insecure_skip_verify: bool,
    pub timeout: Option<Duration>,
    pub retry_policy: Option<RetryPolicy>,
    pub logger: Option<Arc<dyn Logger>>,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("timeout", &self.timeout)
            .field("retry_policy", &self.retry_policy)
            .field("logger", &self.logger.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// Client for the n8n REST API.
///
/// Cheap to clone; clones share the connection pool and cookie store. Calls
/// keep no state between each other, so one client can serve many tasks
/// concurrently.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth: Auth,
    retry: RetryPolicy,
    timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl ApiClient {
    /// Builds a client, reading any cookie file from the real filesystem.
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::with_runtime(options, &RealRuntime)
    }

    /// Builds a client using `runtime` for filesystem and directory lookups.
    #[tracing::instrument(skip_all)]
    pub fn with_runtime<R: Runtime + ?Sized>(options: ClientOptions, runtime: &R) -> Result<Self> {
        let base_url = normalize_base_url(&options.base_url)?;

        let auth = options.auth.ok_or_else(|| {
            ClientError::Config(
                "authentication is required: set an API key, email and password, or session auth"
                    .to_string(),
            )
        })?;

        let timeout = options
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(DEFAULT_TIMEOUT);
        let retry = options.retry_policy.unwrap_or_default().or_default();
        let logger = options
            .logger
            .unwrap_or_else(|| Arc::new(LogLogger) as Arc<dyn Logger>);

        let mut builder = Client::builder().user_agent(USER_AGENT).timeout(timeout);

        if options.insecure_skip_verify {
            warn!("TLS certificate verification is disabled for {}", base_url);
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(jar) = auth.cookie_store(runtime)? {
            builder = builder.cookie_provider(jar);
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        debug!(
            "Created API client for {} ({} auth, timeout {:?}, {} retries)",
            base_url,
            auth.kind(),
            timeout,
            retry.max_retries
        );

        Ok(Self {
            client,
            base_url,
            auth,
            retry,
            timeout,
            logger,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Performs a GET request, decoding the response into `target` if given.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, target: Option<&mut T>) -> Result<()> {
        self.request::<(), T>(Method::GET, path, None, target).await
    }

    /// Performs a POST request with a JSON body.
    pub async fn post<B, T>(&self, path: &str, body: &B, target: Option<&mut T>) -> Result<()>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body), target).await
    }

    /// Performs a PUT request with a JSON body.
    pub async fn put<B, T>(&self, path: &str, body: &B, target: Option<&mut T>) -> Result<()>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(body), target).await
    }

    /// Performs a PATCH request with a JSON body.
    pub async fn patch<B, T>(&self, path: &str, body: &B, target: Option<&mut T>) -> Result<()>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, path, Some(body), target).await
    }

    /// Performs a DELETE request.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str, target: Option<&mut T>) -> Result<()> {
        self.request::<(), T>(Method::DELETE, path, None, target).await
    }

    /// Sends one logical call, retrying transient failures.
    ///
    /// `path` is relative to the API prefix and may carry a query string.
    /// When the call succeeds with a non-empty body and `target` is given,
    /// the body is decoded into it; an empty body leaves `target` untouched.
    #[tracing::instrument(skip(self, body, target))]
    pub async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        target: Option<&mut T>,
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = match body {
            Some(body) => Some(serde_json::to_vec(body).map_err(ClientError::Serialization)?),
            None => None,
        };

        let url = resolve(&self.base_url, path)?;
        self.execute(method, url, payload, target).await
    }

    /// Fetches every page of a cursor-paginated collection.
    ///
    /// Each page's `data` array is appended to the result (a bare array
    /// response is taken as-is). Stops when a page has no `nextCursor`, or
    /// after [`MAX_PAGES`] pages.
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self, path: &str) -> Result<Vec<Value>> {
        let first_url = resolve(&self.base_url, path)?;
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 1..=MAX_PAGES {
            let mut url = first_url.clone();
            if let Some(cursor) = &cursor {
                url.query_pairs_mut().append_pair("cursor", cursor);
            }

            let mut page = Value::Null;
            self.execute(Method::GET, url, None, Some(&mut page)).await?;

            match &page {
                Value::Array(data) => items.extend(data.iter().cloned()),
                _ => {
                    if let Some(Value::Array(data)) = page.get("data") {
                        items.extend(data.iter().cloned());
                    }
                }
            }

            let info = PageInfo::from_value(&page);
            debug!(
                "Fetched page {} of {} ({} items so far, has_next: {})",
                page_number,
                path,
                items.len(),
                info.has_next
            );

            if !info.has_next {
                return Ok(items);
            }
            cursor = Some(info.next_cursor);
        }

        warn!("Stopped paging {} after {} pages", path, MAX_PAGES);
        Ok(items)
    }

    /// The retry loop: one fresh request per attempt.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        payload: Option<Vec<u8>>,
        mut target: Option<&mut T>,
    ) -> Result<()> {
        let attempts = self.retry.max_attempts();

        for attempt in 0..attempts {
            let attempts_left = attempt + 1 < attempts;

            let mut builder = self
                .client
                .request(method.clone(), url.clone())
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json");
            if let Some(bytes) = &payload {
                builder = builder.body(bytes.clone());
            }
            let builder = self.auth.decorate(builder);

            self.log_request(&method, &url, attempt + 1, attempts, payload.as_deref());

            let (status, bytes) = match send(builder).await {
                Ok(response) => response,
                Err(e) => {
                    if attempts_left && is_transient_error(&e) {
                        let delay = self.retry.delay(attempt);
                        warn!(
                            "{} {}: attempt {}/{} failed ({}), retrying in {:?}...",
                            method,
                            url,
                            attempt + 1,
                            attempts,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    debug!("{} {}: non-retryable transport error: {}", method, url, e);
                    return Err(anyhow::Error::from(ClientError::Transport(e))
                        .context(format!("{} {} failed", method, url)));
                }
            };

            let text = String::from_utf8_lossy(&bytes);
            self.logger.log(&format!(
                "<-- {} {} {} (attempt {}/{}) body: {}",
                status.as_u16(),
                method,
                url,
                attempt + 1,
                attempts,
                text
            ));

            if status.as_u16() >= 400 {
                if attempts_left && is_retryable_status(status) {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "{} {}: attempt {}/{} returned {}, retrying in {:?}...",
                        method,
                        url,
                        attempt + 1,
                        attempts,
                        status,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                return Err(ApiError::from_response(status, &text).into());
            }

            if let Some(target) = target.as_deref_mut() {
                if !is_blank(&bytes) {
                    *target = serde_json::from_slice(&bytes).map_err(ClientError::Deserialization)?;
                }
            }
            return Ok(());
        }

        Err(ClientError::RetriesExhausted { attempts }.into())
    }

    fn log_request(&self, method: &Method, url: &Url, attempt: u32, attempts: u32, payload: Option<&[u8]>) {
        let mut line = format!("--> {} {} (attempt {}/{})", method, url, attempt, attempts);
        if let Some(bytes) = payload {
            line.push_str(" body: ");
            line.push_str(&String::from_utf8_lossy(bytes));
        }
        self.logger.log(&line);
    }
}

/// Sends the request and reads the whole body.
async fn send(builder: reqwest::RequestBuilder) -> Result<(StatusCode, Vec<u8>), reqwest::Error> {
    let response = builder.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;
    Ok((status, bytes.to_vec()))
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}
