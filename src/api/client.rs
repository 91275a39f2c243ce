//! HTTP client for the Car2DB API with timeout, retry and error normalisation.
//!
//! Every logical `get` runs as a small state machine:
//!
//! ```text
//! ATTEMPTING(n) ──2xx + valid JSON──────────────▶ SUCCEEDED
//!      │
//!      ├──5xx or timeout, n < max_retries──▶ sleep(base * 2^n) ──▶ ATTEMPTING(n + 1)
//!      │
//!      └──4xx, other error, or n == max_retries──────────────────▶ FAILED
//! ```
//!
//! Headers are assembled at send time, so a referer change is visible to the
//! next attempt even within the same logical call.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, REFERER};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{ApiError, FetchError, FetchResult};
use super::query::QueryParams;

/// Base URL of the Car2DB API.
pub const DEFAULT_BASE_URL: &str = "https://v3.api.car2db.com";

/// Per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Default `Accept-Language` value.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Referer used until a client identifies itself.
pub const DEFAULT_REFERER: &str = "unknown";

/// Client configuration. Immutable once the client is built, except for the
/// referer which [`ApiClient::set_referer`] can replace.
#[derive(Clone)]
pub struct ClientConfig {
    base_url: String,
    api_key: String,
    referer: String,
    language: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl ClientConfig {
    /// Creates a configuration with default settings for the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            referer: DEFAULT_REFERER.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Overrides the API base URL (used by tests and proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the initial referer.
    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    /// Sets the `Accept-Language` tag.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base backoff delay.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the language tag.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the per-attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the maximum number of retries.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the base backoff delay.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

// Never print the API key.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("referer", &self.referer)
            .field("language", &self.language)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

/// Returns the backoff delay before retry number `attempt + 1`: `base * 2^attempt`.
#[must_use]
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// Resilient client for the Car2DB API.
#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    referer: RwLock<String>,
}

impl ApiClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> FetchResult<Self> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;

        let referer = RwLock::new(config.referer.clone());

        Ok(Self {
            http,
            config,
            referer,
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the current referer.
    #[must_use]
    pub fn referer(&self) -> String {
        self.referer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the referer for all subsequent requests.
    ///
    /// Values that cannot be sent as an HTTP header are ignored.
    pub fn set_referer(&self, referer: impl Into<String>) {
        let referer = referer.into();
        if HeaderValue::from_str(&referer).is_err() {
            warn!(referer = %referer, "Ignoring referer that is not a valid header value");
            return;
        }

        debug!(referer = %referer, "Referer updated");
        *self.referer.write().unwrap_or_else(PoisonError::into_inner) = referer;
    }

    /// Performs a GET request and decodes the JSON response.
    ///
    /// Retries 5xx responses and timeouts with exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns the normalised [`ApiError`] for non-2xx responses, a timeout
    /// error once retries are exhausted, or a decode error for malformed JSON.
    #[tracing::instrument(level = "debug", skip(self, params))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: &QueryParams) -> FetchResult<T> {
        let url = self.build_url(path, params)?;
        let body = self.fetch_with_retry(&url).await?;

        // A successful response with a malformed body is terminal.
        serde_json::from_slice(&body).map_err(FetchError::Decode)
    }

    /// Builds the absolute URL for `path` with the present query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidPath`] if `path` does not start with `/`.
    pub fn build_url(&self, path: &str, params: &QueryParams) -> FetchResult<Url> {
        if !path.starts_with('/') {
            return Err(FetchError::InvalidPath {
                path: path.to_string(),
            });
        }

        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{path}")).map_err(|_| FetchError::InvalidPath {
            path: path.to_string(),
        })?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params.present() {
                pairs.append_pair(key, &value.to_string());
            }
        }

        Ok(url)
    }

    /// Runs attempts until success, a terminal failure, or retry exhaustion.
    async fn fetch_with_retry(&self, url: &Url) -> FetchResult<Vec<u8>> {
        let mut attempt: u32 = 0;

        loop {
            debug!(url = %url, attempt, "Sending request");

            match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.retry_delay, attempt);
                    warn!(
                        url = %url,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(url = %url, attempt, error = %err, "Request failed");
                    return Err(err);
                }
            }
        }
    }

    /// A single timeout-bounded attempt. Returns the body of a 2xx response.
    async fn attempt(&self, url: &Url) -> FetchResult<Vec<u8>> {
        let timeout = self.config.timeout;
        let request = self.http.get(url.clone()).headers(self.headers()?);

        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| network_error(e, timeout))?;
            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| network_error(e, timeout))?;
            Ok::<_, FetchError>((status, body))
        };

        let (status, body) = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| FetchError::Timeout { timeout })??;

        if !status.is_success() {
            return Err(ApiError::from_response_parts(
                status.as_u16(),
                status.canonical_reason(),
                &body,
            )
            .into());
        }

        Ok(body.to_vec())
    }

    /// Assembles the request headers from the current configuration.
    fn headers(&self) -> FetchResult<HeaderMap> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|_| FetchError::InvalidHeader {
                name: "Authorization",
            })?;
        auth.set_sensitive(true);

        let referer = HeaderValue::from_str(&self.referer())
            .map_err(|_| FetchError::InvalidHeader { name: "Referer" })?;
        let language = HeaderValue::from_str(&self.config.language).map_err(|_| {
            FetchError::InvalidHeader {
                name: "Accept-Language",
            }
        })?;

        let mut headers = HeaderMap::with_capacity(4);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(REFERER, referer);
        headers.insert(ACCEPT_LANGUAGE, language);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

fn network_error(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout { timeout }
    } else {
        FetchError::Network(err)
    }
}
