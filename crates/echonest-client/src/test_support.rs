// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory transport for unit tests.

use crate::client::EchoNestClient;
use crate::error::Result;
use crate::rate_limiter::RateLimiter;
use crate::request::{ApiRequest, RequestBody};
use crate::transport::{RawResponse, Transport};
use async_trait::async_trait;
use echonest_config::EchoNestConfig;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
}

#[derive(Debug, Default)]
struct StubState {
    responses: VecDeque<RawResponse>,
    recorded: Vec<Recorded>,
}

/// Replays queued responses in order; the last one repeats forever.
#[derive(Debug, Clone, Default)]
pub(crate) struct StubTransport {
    state: Arc<Mutex<StubState>>,
}

impl StubTransport {
    /// A stub answering every call with a successful envelope around `payload`.
    pub fn json(payload: Value) -> Self {
        Self::default().then_json(payload)
    }

    /// A stub answering every call with a nonzero status.
    pub fn status(code: i64, message: &str) -> Self {
        Self::default().then_status(code, message)
    }

    pub fn then_json(self, payload: Value) -> Self {
        let mut response = payload;
        if let Some(object) = response.as_object_mut() {
            object.insert("status".into(), json!({"code": 0, "message": "Success"}));
        }
        self.then_raw(200, json!({ "response": response }).to_string())
    }

    pub fn then_status(self, code: i64, message: &str) -> Self {
        let body = json!({"response": {"status": {"code": code, "message": message}}});
        self.then_raw(400, body.to_string())
    }

    pub fn then_raw(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back(RawResponse::new(status, body));
        self
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().recorded.len()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().recorded.clone()
    }

    pub fn last_url(&self) -> Option<String> {
        self.recorded().last().map(|r| r.url.clone())
    }

    pub fn last_body(&self) -> Option<String> {
        self.recorded().last().and_then(|r| r.body.clone())
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let mut state = self.state.lock().unwrap();
        let body = match &request.body {
            RequestBody::Empty => None,
            RequestBody::Form(form) => Some(form.clone()),
            RequestBody::Raw(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        };
        state.recorded.push(Recorded {
            method: request.method.to_string(),
            url: request.url.to_string(),
            body,
        });

        let response = if state.responses.len() > 1 {
            state.responses.pop_front()
        } else {
            state.responses.front().cloned()
        };
        Ok(response.unwrap_or_else(|| RawResponse::new(200, "")))
    }
}

pub(crate) fn client_with_config(stub: &StubTransport, config: EchoNestConfig) -> EchoNestClient {
    EchoNestClient::builder(config)
        .transport(Arc::new(stub.clone()))
        .rate_limiter(RateLimiter::disabled())
        .build()
        .unwrap()
}

pub(crate) fn client_with(stub: &StubTransport) -> EchoNestClient {
    client_with_config(stub, EchoNestConfig::with_api_key("KEY"))
}
