//! reqwest-backed transport
//!
//! Provides an HTTP transport that handles:
//! - Per-host rate limiting to prevent API throttling
//! - Request timeouts
//! - Form and JSON bodies

use super::rate_limit::{HostRateLimiter, RateLimiterConfig};
use super::transport::Transport;
use crate::connector::{RawResponse, RequestBody, RequestSpec};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Rate limiter configuration, applied per host
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            rate_limit: Some(RateLimiterConfig::default()),
            user_agent: format!("auditpull/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpTransportConfig {
    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set or disable rate limiting
    #[must_use]
    pub fn with_rate_limit(mut self, config: Option<RateLimiterConfig>) -> Self {
        self.rate_limit = config;
        self
    }

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }
}

/// HTTP transport with rate limiting
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
    rate_limiter: Option<HostRateLimiter>,
}

impl HttpTransport {
    /// Create a transport with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Create a transport with custom configuration
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.clone().map(HostRateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestSpec) -> Result<RawResponse> {
        let url = Url::parse(&request.url)?;

        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait(url.host_str().unwrap_or_default()).await;
        }

        let mut req = self.client.request(request.method.into(), url);

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        req = match &request.body {
            RequestBody::None => req,
            RequestBody::Form(params) => req.form(params),
            RequestBody::Json(body) => req.json(body),
        };

        match req.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.map_err(|e| {
                    Error::retryable(Some(status), format!("Failed to read response body: {e}"))
                })?;
                debug!(status, method = ?request.method, url = %request.url, "Vendor responded");
                Ok(RawResponse { status, body })
            }
            Err(e) if e.is_timeout() => Err(Error::Timeout {
                operation: "vendor request".to_string(),
                timeout_ms: self.config.timeout.as_millis() as u64,
            }),
            Err(e) if e.is_connect() => Err(Error::retryable(
                None,
                format!("connection to vendor failed: {e}"),
            )),
            // Connection dropped after the request went out
            Err(e) if e.is_request() || e.is_body() => Err(Error::retryable(
                None,
                format!("no response from vendor: {e}"),
            )),
            Err(e) => Err(Error::Http(e)),
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}
