// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{EchoNestError, Result};
use crate::rate_limiter::RateLimiter;
use crate::request::{Params, Payload, RequestBuilder};
use crate::response;
use crate::transport::{HttpTransport, Transport};
use echonest_config::EchoNestConfig;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, trace};

/// Echo Nest API client with rate limiting.
///
/// Cloning is cheap; clones share the transport, the configuration and the
/// rate limiter's call log.
#[derive(Debug, Clone)]
pub struct EchoNestClient {
    config: Arc<EchoNestConfig>,
    requests: RequestBuilder,
    transport: Arc<dyn Transport>,
    rate_limiter: RateLimiter,
}

impl EchoNestClient {
    /// Create a client from a loaded configuration.
    pub fn new(config: EchoNestConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Create a client builder for custom configuration.
    pub fn builder(config: EchoNestConfig) -> EchoNestClientBuilder {
        EchoNestClientBuilder::new(config)
    }

    pub fn config(&self) -> &EchoNestConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// GET `method_path` (e.g. `artist/profile`) and return the decoded payload.
    ///
    /// # Example
    /// ```no_run
    /// # use echonest_client::{EchoNestClient, Params};
    /// # use echonest_config::EchoNestConfig;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = EchoNestClient::new(EchoNestConfig::with_api_key("YOUR_KEY"))?;
    /// let params = Params::new().with("name", "the national");
    /// let payload = client.get("artist/profile", params).await?;
    /// println!("{}", payload["artist"]["id"]);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(&self, method_path: &str, params: Params) -> Result<Value> {
        self.call(method_path, params, Payload::None, None).await
    }

    /// POST with parameters and `data` fields urlencoded in the body.
    pub async fn post(&self, method_path: &str, params: Params, data: Params) -> Result<Value> {
        self.call(method_path, params, Payload::Form(data), None)
            .await
    }

    /// POST raw bytes (file upload). Parameters travel on the URL and the
    /// upload timeout applies instead of the regular call timeout.
    pub async fn upload(&self, method_path: &str, params: Params, body: Vec<u8>) -> Result<Value> {
        let timeout = self.config.transport.upload_timeout();
        self.call(method_path, params, Payload::Raw(body), Some(timeout))
            .await
    }

    /// Form POST that may run long (e.g. server-side analysis); uses the
    /// upload timeout.
    pub async fn post_long(&self, method_path: &str, params: Params, data: Params) -> Result<Value> {
        let timeout = self.config.transport.upload_timeout();
        self.call(method_path, params, Payload::Form(data), Some(timeout))
            .await
    }

    /// Rate limit, build, send and decode one call.
    pub async fn call(
        &self,
        method_path: &str,
        params: Params,
        payload: Payload,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        self.rate_limiter.acquire().await?;

        let mut request = self.requests.build(method_path, &params, payload)?;
        request.timeout = timeout.or(Some(self.config.transport.call_timeout()));

        let traced = self.config.transport.trace_api_calls;
        if traced {
            info!(target: "echonest", "{} {}", request.method, request.url);
        } else {
            trace!(target: "echonest", "{} {}", request.method, request.url);
        }

        let started = Instant::now();
        let raw = self.transport.send(request).await?;

        if traced {
            info!(
                target: "echonest",
                "took {:.2}s: ({})",
                started.elapsed().as_secs_f64(),
                raw.status
            );
        } else {
            trace!(
                target: "echonest",
                "took {:.2}s: ({})",
                started.elapsed().as_secs_f64(),
                raw.status
            );
        }

        response::from_raw(&raw)?.decode()
    }
}

/// Builder for configuring an Echo Nest client.
#[derive(Debug)]
pub struct EchoNestClientBuilder {
    config: EchoNestConfig,
    base_url: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    rate_limiter: Option<RateLimiter>,
}

impl EchoNestClientBuilder {
    pub fn new(config: EchoNestConfig) -> Self {
        Self {
            config,
            base_url: None,
            transport: None,
            rate_limiter: None,
        }
    }

    /// Replace `scheme://host` (useful for testing with mock servers).
    /// Selector and version from the configuration are still appended.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Use a custom transport instead of the reqwest-backed one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a specific rate limiter, e.g. one shared with another client.
    pub fn rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Build the Echo Nest client.
    pub fn build(self) -> Result<EchoNestClient> {
        let api = &self.config.api;
        let api_key = api
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| EchoNestError::Configuration("no API key configured".to_string()))?;

        let endpoint_base = match &self.base_url {
            Some(base) => format!(
                "{}/{}/{}",
                base.trim_end_matches('/'),
                api.selector.trim_matches('/'),
                api.version.trim_matches('/')
            ),
            None => api.endpoint_base(),
        };
        let requests = RequestBuilder::new(endpoint_base, api_key, &api.user_agent, api.format)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.config.transport.call_timeout())?),
        };

        let rate_limiter = match self.rate_limiter {
            Some(rate_limiter) => rate_limiter,
            None => RateLimiter::from_config(&self.config.rate_limit)?,
        };

        Ok(EchoNestClient {
            config: Arc::new(self.config),
            requests,
            transport,
            rate_limiter,
        })
    }
}
