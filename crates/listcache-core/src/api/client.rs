//! HTTP client for the shopping-list backend.
//!
//! `ApiClient` implements [`Transport`] on top of `reqwest`. It knows how to
//! reach the API base, attach the bearer token and back off on 429s; it knows
//! nothing about caching or queueing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};

use super::routes::join_api;
use super::{ApiError, Transport};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Bounds every replay of a queued mutation as well as interactive calls.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for the reachability probe. Short, it runs on every watch tick.
const PROBE_TIMEOUT_SECS: u64 = 5;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the shopping-list backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<Arc<str>>,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (e.g. `http://host:8080/api`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: impl Into<Arc<str>>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_api(&self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Check whether the backend answers at all.
    ///
    /// Any HTTP response, even an error status, counts as reachable; only a
    /// failure to get a response does not.
    pub async fn probe(&self) -> bool {
        let result = self
            .client
            .get(&self.base_url)
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .send()
            .await;

        match result {
            Ok(response) => {
                debug!(status = %response.status(), "Backend reachable");
                true
            }
            Err(e) => {
                debug!(error = %e, "Backend unreachable");
                false
            }
        }
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: Response) -> Result<Option<Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Decode a JSON body, treating an empty body as `null`
    async fn decode(response: Response, url: &str) -> Result<Value, ApiError> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e)))
    }

    /// Send a request, backing off exponentially while the server answers 429
    async fn send<F>(&self, url: &str, build: F) -> Result<Value, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self.authorize(build()).send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Self::decode(response, url).await,
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn perform_read(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        self.send(&url, || self.client.get(&url)).await
    }

    async fn perform_write(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        self.send(&url, || {
            self.client
                .post(&url)
                .header(header::CONTENT_TYPE, "application/json")
                .json(body)
        })
        .await
    }
}
