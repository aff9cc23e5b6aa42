//! Main gateway API client implementation.

use crate::api::{ListsApi, RulesApi};
use crate::config::{RetryConfig, DEFAULT_RATE_INTERVAL};
use crate::retry::{with_rate_limit, with_retry, RateGate};
use gatesync_core::{ApiEnvelope, GatewayError, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// The gateway API base URL
const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Main gateway API client.
///
/// Cheap to clone; clones share the HTTP pool and the mutation gate, so the
/// one-call-per-interval limit holds across every clone.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    account_id: String,
    api_token: String,
    base_url: String,
    retry_config: RetryConfig,
    gate: RateGate,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("account_id", &self.inner.account_id)
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a new client for the given account using default settings
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Result<Self> {
        GatewayClientBuilder::new(account_id, api_token).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(
        account_id: impl Into<String>,
        api_token: impl Into<String>,
    ) -> GatewayClientBuilder {
        GatewayClientBuilder::new(account_id, api_token)
    }

    /// Access list endpoints
    #[must_use]
    pub fn lists(&self) -> ListsApi<'_> {
        ListsApi::new(self)
    }

    /// Access rule endpoints
    #[must_use]
    pub fn rules(&self) -> RulesApi<'_> {
        RulesApi::new(self)
    }

    /// Retry policy applied to every call
    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.inner.retry_config
    }

    /// Perform a GET request
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiEnvelope<T>> {
        self.get_with_query(path, &[]).await
    }

    /// Perform a GET request with query parameters
    pub(crate) async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<ApiEnvelope<T>> {
        self.execute(Method::GET, path, params, None).await
    }

    /// Perform a POST request with JSON body
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, path, &[], Some(&body)).await
    }

    /// Perform a PATCH request with JSON body
    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::PATCH, path, &[], Some(&body)).await
    }

    /// Perform a PUT request with JSON body
    pub(crate) async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::PUT, path, &[], Some(&body)).await
    }

    /// Perform a DELETE request
    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        self.execute::<serde_json::Value>(Method::DELETE, path, &[], None)
            .await
            .map(|_| ())
    }

    /// Send one logical request: retried on transient failure, and gated
    /// through the shared rate limit when it mutates remote state.
    #[instrument(skip(self, method, params, body), fields(method = %method))]
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<ApiEnvelope<T>> {
        let url = self.build_url(path)?;
        let mutating = method != Method::GET;
        let operation = format!("{method} {path}");

        with_retry(&self.inner.retry_config, &operation, || {
            let method = method.clone();
            let url = url.clone();
            async move {
                let attempt = self.send_once(method, url, path, params, body);
                if mutating {
                    with_rate_limit(&self.inner.gate, attempt).await
                } else {
                    attempt.await
                }
            }
        })
        .await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        path: &str,
        params: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<ApiEnvelope<T>> {
        debug!(url = %url, method = %method, "gateway request");

        let mut request = self
            .inner
            .http
            .request(method, url)
            .bearer_auth(&self.inner.api_token);
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        self.handle_response(path, response).await
    }

    /// Build the account-scoped gateway URL for a path
    fn build_url(&self, path: &str) -> Result<Url> {
        let raw = format!(
            "{}/accounts/{}/gateway{}",
            self.inner.base_url.trim_end_matches('/'),
            self.inner.account_id,
            path
        );
        Url::parse(&raw).map_err(|e| GatewayError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Handle an API response wrapped in the standard envelope
    async fn handle_response<T: DeserializeOwned>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<ApiEnvelope<T>> {
        let status = response.status();

        if !status.is_success() {
            return Self::handle_error(path, response).await;
        }

        let body = response.text().await.map_err(map_transport_error)?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(GatewayError::Api {
                code: status.as_u16(),
                message: envelope
                    .error_message()
                    .unwrap_or_else(|| "request reported failure".to_string()),
            });
        }
        Ok(envelope)
    }

    /// Convert an error response to a [`GatewayError`]
    async fn handle_error<T>(path: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        // Prefer the envelope's error list over the raw body
        let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
            .ok()
            .and_then(|env| env.error_message())
            .unwrap_or(body);

        match status {
            401 | 403 => Err(GatewayError::Unauthorized(message)),
            404 => Err(GatewayError::NotFound {
                resource: path.to_string(),
            }),
            429 => {
                warn!(path, ?retry_after, "rate limited by gateway API");
                Err(GatewayError::RateLimited { retry_after })
            }
            _ => Err(GatewayError::Api {
                code: status,
                message,
            }),
        }
    }
}

fn map_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(err.to_string())
    } else if err.is_connect() {
        GatewayError::Connection(err.to_string())
    } else {
        GatewayError::Http(err.to_string())
    }
}

/// Builder for configuring a [`GatewayClient`]
pub struct GatewayClientBuilder {
    account_id: String,
    api_token: String,
    base_url: String,
    timeout: Duration,
    user_agent: String,
    retry_config: RetryConfig,
    rate_interval: Duration,
}

impl GatewayClientBuilder {
    /// Create a new builder for the given account and API token
    #[must_use]
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("gatesync/{}", env!("CARGO_PKG_VERSION")),
            retry_config: RetryConfig::default(),
            rate_interval: DEFAULT_RATE_INTERVAL,
        }
    }

    /// Set the base URL (useful for testing)
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set retry configuration
    #[must_use]
    pub const fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Set the minimum spacing between mutating calls (zero disables it)
    #[must_use]
    pub const fn rate_interval(mut self, interval: Duration) -> Self {
        self.rate_interval = interval;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<GatewayClient> {
        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(GatewayClient {
            inner: Arc::new(ClientInner {
                http,
                account_id: self.account_id,
                api_token: self.api_token,
                base_url: self.base_url,
                retry_config: self.retry_config,
                gate: RateGate::new(self.rate_interval),
            }),
        })
    }
}
