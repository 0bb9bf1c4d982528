// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{EchoNestError, Result};
use crate::request::{ApiRequest, RequestBody};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, trace};

/// Status and body of an HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Performs one HTTP call.
///
/// Implementations return the response for every status that may carry a
/// structured error body (2xx, 4xx, 5xx) and fail only for connection
/// problems or statuses outside those classes.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse>;
}

/// Whether the service may have put an envelope in a response with this status.
pub fn carries_envelope(status: u16) -> bool {
    matches!(status / 100, 2 | 4 | 5)
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport whose calls time out after `timeout` unless the
    /// request sets its own.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        trace!(target: "echonest", "{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(body) => builder.body(body),
            RequestBody::Raw(bytes) => builder.body(bytes),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        debug!(target: "echonest", "response status: {}", status);

        if !carries_envelope(status) {
            return Err(EchoNestError::UnexpectedStatus(status));
        }

        let body = response.bytes().await?;
        trace!(target: "echonest", "response body: {} bytes", body.len());

        Ok(RawResponse::new(status, body.to_vec()))
    }
}
