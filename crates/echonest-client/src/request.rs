// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{EchoNestError, Result};
use echonest_config::ResponseFormat;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use std::collections::BTreeMap;
use std::time::Duration;
use url::form_urlencoded;
use url::Url;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// A request parameter value: one string, or several sent as repeated pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Single(value.clone())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Single(if value { "true" } else { "false" }.to_string())
    }
}

macro_rules! numeric_param {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ParamValue {
            fn from(value: $ty) -> Self {
                Self::Single(value.to_string())
            }
        })*
    };
}

numeric_param!(u32, u64, usize, i32, i64, f32, f64);

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

impl From<&[&str]> for ParamValue {
    fn from(values: &[&str]) -> Self {
        Self::Multi(values.iter().map(|v| v.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ParamValue {
    fn from(values: [&str; N]) -> Self {
        Self::Multi(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Request parameters keyed by name.
///
/// Ordered and hashable so the same set of parameters always encodes the same
/// way and can key a cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, replacing any previous value for `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style insert that skips `None`.
    pub fn with_opt<V: Into<ParamValue>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.insert_opt(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn insert_opt<V: Into<ParamValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Append one value to a multi-valued parameter.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let entry = self
            .0
            .entry(key.into())
            .or_insert_with(|| ParamValue::Multi(Vec::new()));
        if let ParamValue::Single(existing) = entry {
            *entry = ParamValue::Multi(vec![std::mem::take(existing)]);
        }
        if let ParamValue::Multi(values) = entry {
            values.push(value.into());
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add every entry of `other`, overwriting on key collisions.
    pub fn extend(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    /// Flatten into key/value pairs, expanding lists into repeated keys.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            match value {
                ParamValue::Single(v) => pairs.push((key.as_str(), v.as_str())),
                ParamValue::Multi(values) => {
                    pairs.extend(values.iter().map(|v| (key.as_str(), v.as_str())))
                }
            }
        }
        pairs
    }

    /// `application/x-www-form-urlencoded` rendering of [`Params::pairs`].
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }
}

/// What goes in the request body.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    /// Plain GET; all parameters on the query string.
    #[default]
    None,
    /// POST with parameters urlencoded into the body, plus extra form fields.
    Form(Params),
    /// POST with raw bytes as the body (file upload); parameters stay on the URL.
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    Form(String),
    Raw(Vec<u8>),
}

/// A fully formed HTTP request, ready for a [`crate::transport::Transport`].
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Turns a method path plus parameters into an [`ApiRequest`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    api_key: String,
    user_agent: HeaderValue,
    format: ResponseFormat,
}

impl RequestBuilder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        user_agent: &str,
        format: ResponseFormat,
    ) -> Result<Self> {
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| EchoNestError::Configuration(format!("invalid user agent: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            user_agent,
            format,
        })
    }

    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    /// Build a request for `method_path` (e.g. `artist/profile`).
    ///
    /// The API key and response format are always injected. For a form
    /// payload the extra fields are merged into the body alongside the
    /// parameters; for a raw payload the parameters go on the query string.
    pub fn build(&self, method_path: &str, params: &Params, payload: Payload) -> Result<ApiRequest> {
        let endpoint = format!("{}/{}", self.base_url, method_path.trim_start_matches('/'));
        let mut url = Url::parse(&endpoint)
            .map_err(|e| EchoNestError::InvalidRequest(format!("{}: {}", endpoint, e)))?;

        let mut params = params.clone();
        params.insert("api_key", self.api_key.as_str());
        params.insert("format", self.format.as_str());

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, self.user_agent.clone());

        let (method, body) = match payload {
            Payload::None => {
                url.set_query(Some(&params.encode()));
                (Method::GET, RequestBody::Empty)
            }
            Payload::Form(data) => {
                let mut form = data;
                form.extend(params);
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
                (Method::POST, RequestBody::Form(form.encode()))
            }
            Payload::Raw(bytes) => {
                url.set_query(Some(&params.encode()));
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static(OCTET_STREAM_CONTENT_TYPE),
                );
                (Method::POST, RequestBody::Raw(bytes))
            }
        };

        Ok(ApiRequest {
            method,
            url,
            headers,
            body,
            timeout: None,
        })
    }
}
