// SPDX-License-Identifier: GPL-3.0-or-later

//! Shared base for every entity type: an identifier, a private cache and the
//! generic "fetch one bucket" call.
//!
//! Fields are resolved lazily. Each field is described by a static [`Field`]
//! naming the method that serves it and where its value sits in the decoded
//! payload. A resolved value is cached under the field name *and* the exact
//! parameters used to fetch it, so asking again with different pagination or
//! filters always goes back to the service.

use crate::client::EchoNestClient;
use crate::error::{EchoNestError, Result};
use crate::identifier::Identifier;
use crate::request::Params;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Remote entity families with their own method namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Artist,
    Song,
    Track,
    Catalog,
    Playlist,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Song => "song",
            Self::Track => "track",
            Self::Catalog => "catalog",
            Self::Playlist => "playlist",
        }
    }

    /// Whether entities of this type may be addressed by name. Songs and
    /// tracks only exist under an id.
    pub fn accepts_names(&self) -> bool {
        matches!(self, Self::Artist | Self::Catalog)
    }

    /// Full method path, e.g. `artist/profile`.
    pub fn method_path(&self, method: &str) -> String {
        format!("{}/{}", self.as_str(), method)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where one lazily fetched field comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Cache name; also the key used when seeding from a profile.
    pub name: &'static str,
    /// Method under the entity's namespace, e.g. `hotttnesss`.
    pub method: &'static str,
    /// Value for the `bucket` parameter, if the method needs one.
    pub bucket: Option<&'static str>,
    /// JSON pointer to the value inside the decoded payload.
    pub pointer: &'static str,
}

impl Field {
    pub const fn new(name: &'static str, method: &'static str, pointer: &'static str) -> Self {
        Self {
            name,
            method,
            bucket: None,
            pointer,
        }
    }

    /// A field served by a `profile`-style call with `bucket=<bucket>`.
    pub const fn bucketed(
        name: &'static str,
        method: &'static str,
        bucket: &'static str,
        pointer: &'static str,
    ) -> Self {
        Self {
            name,
            method,
            bucket: Some(bucket),
            pointer,
        }
    }
}

/// Pagination for list-valued fields. Only values that differ from the
/// service defaults (15 results from offset 0) are sent, so a default page
/// shares its cache slot with values seeded from a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
    pub results: u32,
    pub start: u32,
}

impl Page {
    pub const DEFAULT_RESULTS: u32 = 15;

    pub fn new(results: u32, start: u32) -> Self {
        Self { results, start }
    }

    pub fn params(&self) -> Params {
        let mut params = Params::new();
        if self.results != Self::DEFAULT_RESULTS {
            params.insert("results", self.results);
        }
        if self.start != 0 {
            params.insert("start", self.start);
        }
        params
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RESULTS, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    field: String,
    params: Params,
}

/// Identifier, cache and generic fetch shared by every entity.
#[derive(Debug, Clone)]
pub struct EntityProxy {
    client: EchoNestClient,
    object_type: ObjectType,
    identifier: Option<Identifier>,
    cache: HashMap<CacheKey, Value>,
}

impl EntityProxy {
    pub fn new(client: EchoNestClient, object_type: ObjectType, identifier: Option<Identifier>) -> Self {
        Self {
            client,
            object_type,
            identifier,
            cache: HashMap::new(),
        }
    }

    pub fn client(&self) -> &EchoNestClient {
        &self.client
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    pub fn set_identifier(&mut self, identifier: Identifier) {
        self.identifier = Some(identifier);
    }

    fn cache_enabled(&self) -> bool {
        self.client.config().cache.enabled
    }

    /// Add the identifier under `id` or `name`, depending on its form.
    /// Types that cannot be looked up by name always send `id`.
    fn identify(&self, mut params: Params) -> Params {
        if let Some(identifier) = &self.identifier {
            let key = if self.object_type.accepts_names() {
                identifier.param_key()
            } else {
                "id"
            };
            params.insert(key, identifier.as_str());
        }
        params
    }

    /// GET `<object_type>/<method>` keyed by this entity's identifier.
    pub async fn get_attribute(&self, method: &str, params: Params) -> Result<Value> {
        self.client
            .get(&self.object_type.method_path(method), self.identify(params))
            .await
    }

    /// Same as [`EntityProxy::get_attribute`] without the identifier.
    pub async fn get_attribute_simple(&self, method: &str, params: Params) -> Result<Value> {
        self.client
            .get(&self.object_type.method_path(method), params)
            .await
    }

    /// POST `<object_type>/<method>` keyed by this entity's identifier.
    pub async fn post_attribute(&self, method: &str, params: Params, data: Params) -> Result<Value> {
        self.client
            .post(&self.object_type.method_path(method), self.identify(params), data)
            .await
    }

    /// Record already-known values (from a profile, a parent response or
    /// session state). Seeded values answer calls made with default
    /// parameters while caching is enabled.
    ///
    /// Seeding ignores `cache.enabled`: the values stay readable through
    /// [`EntityProxy::cached`], but [`EntityProxy::resolve`] skips them and
    /// fetches when caching is off.
    pub fn seed(&mut self, fields: Map<String, Value>) {
        for (name, value) in fields {
            self.cache.insert(
                CacheKey {
                    field: name,
                    params: Params::new(),
                },
                value,
            );
        }
    }

    /// A cached value for `name` fetched with default parameters.
    pub fn cached(&self, name: &str) -> Option<&Value> {
        self.cached_with(name, &Params::new())
    }

    pub fn cached_with(&self, name: &str, params: &Params) -> Option<&Value> {
        self.cache.get(&CacheKey {
            field: name.to_string(),
            params: params.clone(),
        })
    }

    /// Store a value under `name` and `params`, unless caching is disabled.
    pub fn store(&mut self, name: &str, params: Params, value: Value) {
        if self.cache_enabled() {
            self.cache.insert(
                CacheKey {
                    field: name.to_string(),
                    params,
                },
                value,
            );
        }
    }

    /// Drop every cached value for `name`, whatever parameters produced it.
    pub fn invalidate(&mut self, name: &str) {
        self.cache.retain(|key, _| key.field != name);
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Resolve `field` with `params`: from cache when the same field was
    /// already fetched with exactly these parameters, otherwise with one
    /// call for just that bucket.
    pub async fn resolve<T: DeserializeOwned>(&mut self, field: &Field, params: Params) -> Result<T> {
        let value = self.resolve_value(field, params).await?;
        serde_json::from_value(value).map_err(|e| {
            EchoNestError::InvalidResponse(format!("{}.{}: {}", self.object_type, field.name, e))
        })
    }

    pub async fn resolve_value(&mut self, field: &Field, params: Params) -> Result<Value> {
        if self.cache_enabled() {
            if let Some(value) = self.cached_with(field.name, &params) {
                trace!(target: "echonest", "cache hit for {}.{}", self.object_type, field.name);
                return Ok(value.clone());
            }
        }

        let mut call_params = params.clone();
        if let Some(bucket) = field.bucket {
            call_params.insert("bucket", bucket);
        }

        let payload = self.get_attribute(field.method, call_params).await?;
        let value = extract(&payload, field.pointer)?;
        self.store(field.name, params, value.clone());
        Ok(value)
    }
}

/// Take the value at `pointer` out of a decoded payload.
pub fn extract(payload: &Value, pointer: &str) -> Result<Value> {
    payload
        .pointer(pointer)
        .cloned()
        .ok_or_else(|| EchoNestError::InvalidResponse(format!("missing {} in response", pointer)))
}

/// Remove a required string field from a record.
pub(crate) fn take_string(fields: &mut Map<String, Value>, key: &str) -> Result<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(EchoNestError::InvalidResponse(format!("missing {}", key))),
    }
}

/// Deserialize the value at `pointer`.
pub fn extract_as<T: DeserializeOwned>(payload: &Value, pointer: &str) -> Result<T> {
    let value = extract(payload, pointer)?;
    serde_json::from_value(value)
        .map_err(|e| EchoNestError::InvalidResponse(format!("{}: {}", pointer, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{client_with, StubTransport};
    use serde_json::json;

    const HOTTTNESSS: Field = Field::new("hotttnesss", "hotttnesss", "/artist/hotttnesss");
    const AUDIO: Field = Field::new("audio", "audio", "/audio");
    const SUMMARY: Field =
        Field::bucketed("audio_summary", "profile", "audio_summary", "/songs/0/audio_summary");

    fn artist_proxy(stub: &StubTransport) -> EntityProxy {
        EntityProxy::new(
            client_with(stub),
            ObjectType::Artist,
            Some(Identifier::parse("ARH6W4X1187B99274F")),
        )
    }

    #[tokio::test]
    async fn identical_params_hit_the_cache() {
        let stub = StubTransport::json(json!({"artist": {"hotttnesss": 0.71}}));
        let mut proxy = artist_proxy(&stub);

        let first: f64 = proxy.resolve(&HOTTTNESSS, Params::new()).await.unwrap();
        let second: f64 = proxy.resolve(&HOTTTNESSS, Params::new()).await.unwrap();

        assert_eq!(first, 0.71);
        assert_eq!(second, 0.71);
        assert_eq!(stub.calls(), 1);
        assert!(stub.last_url().unwrap().contains("id=ARH6W4X1187B99274F"));
    }

    #[tokio::test]
    async fn different_params_always_refetch() {
        let stub = StubTransport::json(json!({"audio": [{"title": "Fake Empire"}]}));
        let mut proxy = artist_proxy(&stub);

        let _: Value = proxy.resolve(&AUDIO, Page::default().params()).await.unwrap();
        let _: Value = proxy.resolve(&AUDIO, Page::new(30, 0).params()).await.unwrap();
        let _: Value = proxy.resolve(&AUDIO, Page::new(15, 15).params()).await.unwrap();
        assert_eq!(stub.calls(), 3);

        let _: Value = proxy.resolve(&AUDIO, Page::new(30, 0).params()).await.unwrap();
        let _: Value = proxy.resolve(&AUDIO, Page::default().params()).await.unwrap();
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn seeded_values_answer_default_calls() {
        let stub = StubTransport::json(json!({"artist": {"hotttnesss": 0.2}}));
        let mut proxy = artist_proxy(&stub);
        proxy.seed(json!({"hotttnesss": 0.9}).as_object().cloned().unwrap());

        let value: f64 = proxy.resolve(&HOTTTNESSS, Params::new()).await.unwrap();
        assert_eq!(value, 0.9);
        assert_eq!(stub.calls(), 0);

        proxy.invalidate("hotttnesss");
        let value: f64 = proxy.resolve(&HOTTTNESSS, Params::new()).await.unwrap();
        assert_eq!(value, 0.2);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn bucketed_fields_send_bucket_param() {
        let stub = StubTransport::json(json!({"songs": [{"audio_summary": {"tempo": 120.5}}]}));
        let mut proxy = EntityProxy::new(
            client_with(&stub),
            ObjectType::Song,
            Some(Identifier::parse("SOCZMFK12AC468668F")),
        );

        let summary: Value = proxy.resolve(&SUMMARY, Params::new()).await.unwrap();
        assert_eq!(summary["tempo"], 120.5);
        let url = stub.last_url().unwrap();
        assert!(url.contains("/song/profile?"), "{url}");
        assert!(url.contains("bucket=audio_summary"), "{url}");
    }

    #[tokio::test]
    async fn names_are_sent_as_name_param() {
        let stub = StubTransport::json(json!({"artist": {"hotttnesss": 0.5}}));
        let mut proxy = EntityProxy::new(
            client_with(&stub),
            ObjectType::Artist,
            Some(Identifier::parse("the national")),
        );
        let _: f64 = proxy.resolve(&HOTTTNESSS, Params::new()).await.unwrap();
        assert!(stub.last_url().unwrap().contains("name=the+national"));
    }

    #[tokio::test]
    async fn missing_pointer_is_invalid_response() {
        let stub = StubTransport::json(json!({"artist": {}}));
        let mut proxy = artist_proxy(&stub);
        let err = proxy.resolve::<f64>(&HOTTTNESSS, Params::new()).await.unwrap_err();
        assert!(matches!(err, EchoNestError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn api_errors_are_not_cached() {
        let stub = StubTransport::status(6, "Unknown artist");
        let mut proxy = artist_proxy(&stub);

        for _ in 0..2 {
            let err = proxy.resolve::<f64>(&HOTTTNESSS, Params::new()).await.unwrap_err();
            assert!(matches!(err, EchoNestError::InvalidId { code: 6, .. }));
        }
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn disabled_cache_always_fetches() {
        let stub = StubTransport::json(json!({"artist": {"hotttnesss": 0.3}}));
        let mut config = echonest_config::EchoNestConfig::with_api_key("KEY");
        config.cache.enabled = false;
        let client = crate::test_support::client_with_config(&stub, config);
        let mut proxy = EntityProxy::new(
            client,
            ObjectType::Artist,
            Some(Identifier::parse("ARH6W4X1187B99274F")),
        );

        let _: f64 = proxy.resolve(&HOTTTNESSS, Params::new()).await.unwrap();
        let _: f64 = proxy.resolve(&HOTTTNESSS, Params::new()).await.unwrap();
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn seeded_values_are_kept_but_bypassed_without_cache() {
        let stub = StubTransport::json(json!({"artist": {"hotttnesss": 0.3}}));
        let mut config = echonest_config::EchoNestConfig::with_api_key("KEY");
        config.cache.enabled = false;
        let client = crate::test_support::client_with_config(&stub, config);
        let mut proxy = EntityProxy::new(
            client,
            ObjectType::Artist,
            Some(Identifier::parse("ARH6W4X1187B99274F")),
        );
        proxy.seed(json!({"hotttnesss": 0.9}).as_object().cloned().unwrap());

        assert_eq!(proxy.cached("hotttnesss"), Some(&json!(0.9)));
        let value: f64 = proxy.resolve(&HOTTTNESSS, Params::new()).await.unwrap();
        assert_eq!(value, 0.3);
        assert_eq!(stub.calls(), 1);
        // A fetched value is not stored while caching is off.
        assert_eq!(proxy.cached("hotttnesss"), Some(&json!(0.9)));
    }

    #[tokio::test]
    async fn songs_always_send_id() {
        let stub = StubTransport::json(json!({"songs": [{"audio_summary": {"tempo": 120.5}}]}));
        let mut proxy = EntityProxy::new(
            client_with(&stub),
            ObjectType::Song,
            Some(Identifier::parse("fake empire")),
        );

        let _: Value = proxy.resolve(&SUMMARY, Params::new()).await.unwrap();
        let url = stub.last_url().unwrap();
        assert!(url.contains("id=fake+empire"), "{url}");
        assert!(!url.contains("name="), "{url}");
        assert!(ObjectType::Catalog.accepts_names());
        assert!(!ObjectType::Track.accepts_names());
    }
}
