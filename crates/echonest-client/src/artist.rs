// SPDX-License-Identifier: GPL-3.0-or-later

//! Artists (`artist/*`).

use crate::client::EchoNestClient;
use crate::error::{EchoNestError, Result};
use crate::identifier::Identifier;
use crate::models::{Document, ForeignId, ResultList, Term, TermSort};
use crate::proxy::{extract_as, take_string, EntityProxy, Field, ObjectType, Page};
use crate::request::Params;
use serde_json::{Map, Value};
use std::fmt;

const HOTTTNESSS: Field = Field::new("hotttnesss", "hotttnesss", "/artist/hotttnesss");
const FAMILIARITY: Field = Field::new("familiarity", "familiarity", "/artist/familiarity");
const AUDIO: Field = Field::new("audio", "audio", "/audio");
const BIOGRAPHIES: Field = Field::new("biographies", "biographies", "/biographies");
const BLOGS: Field = Field::new("blogs", "blogs", "/blogs");
const IMAGES: Field = Field::new("images", "images", "/images");
const NEWS: Field = Field::new("news", "news", "/news");
const REVIEWS: Field = Field::new("reviews", "reviews", "/reviews");
const SIMILAR: Field = Field::new("similar", "similar", "/artists");
const TERMS: Field = Field::new("terms", "terms", "/terms");
const URLS: Field = Field::new("urls", "urls", "/urls");
const VIDEO: Field = Field::new("video", "video", "/video");

const FOREIGN_IDS: &str = "foreign_ids";

/// An artist, identified by id or by name.
#[derive(Debug, Clone)]
pub struct Artist {
    proxy: EntityProxy,
    name: String,
}

impl Artist {
    /// Look up an artist, fetching its profile for the display name.
    pub async fn new(client: EchoNestClient, identifier: impl Into<Identifier>) -> Result<Self> {
        Self::with_buckets(client, identifier, &[]).await
    }

    /// Look up an artist and fetch the given buckets (`hotttnesss`,
    /// `terms`, `id:musicbrainz`, ...) with the profile, so their accessors
    /// need no further call.
    pub async fn with_buckets(
        client: EchoNestClient,
        identifier: impl Into<Identifier>,
        buckets: &[&str],
    ) -> Result<Self> {
        Self::build(client, identifier.into(), Map::new(), buckets).await
    }

    /// Build an artist from data already at hand (a search hit, a nested
    /// record). The profile is only fetched when `name` is missing; every
    /// other field seeds the cache.
    pub async fn from_fields(
        client: EchoNestClient,
        identifier: impl Into<Identifier>,
        fields: Map<String, Value>,
    ) -> Result<Self> {
        Self::build(client, identifier.into(), fields, &[]).await
    }

    async fn build(
        client: EchoNestClient,
        identifier: Identifier,
        mut fields: Map<String, Value>,
        buckets: &[&str],
    ) -> Result<Self> {
        let mut proxy = EntityProxy::new(client, ObjectType::Artist, Some(identifier));

        if !fields.contains_key("name") {
            let mut params = Params::new();
            if !buckets.is_empty() {
                params.insert("bucket", buckets);
            }
            let payload = proxy.get_attribute("profile", params).await?;
            let profile: Map<String, Value> = extract_as(&payload, "/artist")?;
            fields.extend(profile);
        }

        let name = take_string(&mut fields, "name")?;
        if let Some(id) = fields.remove("id").as_ref().and_then(Value::as_str) {
            proxy.set_identifier(Identifier::parse(id));
        }
        proxy.seed(fields);

        Ok(Self { proxy, name })
    }

    pub(crate) async fn from_document(client: EchoNestClient, mut doc: Document) -> Result<Self> {
        let identifier = doc
            .get("id")
            .or_else(|| doc.get("name"))
            .and_then(Value::as_str)
            .map(Identifier::parse)
            .ok_or_else(|| EchoNestError::InvalidResponse("artist without id or name".into()))?;
        doc.remove("request");
        Self::from_fields(client, identifier, doc).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical id once known, otherwise the identifier the artist was
    /// created with.
    pub fn id(&self) -> &str {
        self.proxy.identifier().map(Identifier::as_str).unwrap_or_default()
    }

    pub fn proxy(&self) -> &EntityProxy {
        &self.proxy
    }

    pub async fn hotttnesss(&mut self) -> Result<f64> {
        self.proxy.resolve(&HOTTTNESSS, Params::new()).await
    }

    pub async fn familiarity(&mut self) -> Result<f64> {
        self.proxy.resolve(&FAMILIARITY, Params::new()).await
    }

    pub async fn audio(&mut self, page: Page) -> Result<Vec<Document>> {
        self.proxy.resolve(&AUDIO, page.params()).await
    }

    pub async fn biographies(&mut self, page: Page, license: Option<&str>) -> Result<Vec<Document>> {
        let params = page.params().with_opt("license", license);
        self.proxy.resolve(&BIOGRAPHIES, params).await
    }

    pub async fn blogs(&mut self, page: Page) -> Result<Vec<Document>> {
        self.proxy.resolve(&BLOGS, page.params()).await
    }

    pub async fn images(&mut self, page: Page, license: Option<&str>) -> Result<Vec<Document>> {
        let params = page.params().with_opt("license", license);
        self.proxy.resolve(&IMAGES, params).await
    }

    pub async fn news(&mut self, page: Page) -> Result<Vec<Document>> {
        self.proxy.resolve(&NEWS, page.params()).await
    }

    pub async fn reviews(&mut self, page: Page) -> Result<Vec<Document>> {
        self.proxy.resolve(&REVIEWS, page.params()).await
    }

    pub async fn video(&mut self, page: Page) -> Result<Vec<Document>> {
        self.proxy.resolve(&VIDEO, page.params()).await
    }

    /// Similar artists within optional popularity bounds. Hits come back
    /// with names, so building them costs no further calls.
    pub async fn similar(&mut self, page: Page, bounds: PopularityBounds) -> Result<Vec<Artist>> {
        let mut params = page.params();
        params.extend(bounds.params());
        let docs: Vec<Document> = self.proxy.resolve(&SIMILAR, params).await?;
        artists_from_docs(self.proxy.client(), docs).await
    }

    pub async fn terms(&mut self, sort: TermSort) -> Result<Vec<Term>> {
        let mut params = Params::new();
        if sort != TermSort::default() {
            params.insert("sort", sort.as_str());
        }
        self.proxy.resolve(&TERMS, params).await
    }

    pub async fn urls(&mut self) -> Result<Document> {
        self.proxy.resolve(&URLS, Params::new()).await
    }

    /// The artist's id in an external catalog, or `None` if the service
    /// knows no mapping. Catalog names go through the configured alias table
    /// before matching.
    pub async fn foreign_id(&mut self, idspace: &str) -> Result<Option<String>> {
        let catalog = self.proxy.client().config().map_idspace(idspace).to_string();

        let mut known: Vec<ForeignId> = match self.proxy.cached(FOREIGN_IDS) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| EchoNestError::InvalidResponse(format!("foreign_ids: {}", e)))?,
            None => Vec::new(),
        };

        if !known.iter().any(|f| f.catalog == catalog) {
            let params = Params::new().with("bucket", format!("id:{}", idspace));
            let payload = self.proxy.get_attribute("profile", params).await?;
            let fetched: Vec<ForeignId> = match payload.pointer("/artist/foreign_ids") {
                Some(value) => serde_json::from_value(value.clone())
                    .map_err(|e| EchoNestError::InvalidResponse(format!("foreign_ids: {}", e)))?,
                None => Vec::new(),
            };
            known.extend(fetched);
            let value = serde_json::to_value(&known)
                .map_err(|e| EchoNestError::InvalidResponse(e.to_string()))?;
            self.proxy.store(FOREIGN_IDS, Params::new(), value);
        }

        Ok(known
            .into_iter()
            .find(|f| f.catalog == catalog)
            .map(|f| f.foreign_id))
    }
}

impl fmt::Display for Artist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Familiarity and hotttnesss limits for artist listings. Unset bounds are
/// not sent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PopularityBounds {
    pub max_familiarity: Option<f64>,
    pub min_familiarity: Option<f64>,
    pub max_hotttnesss: Option<f64>,
    pub min_hotttnesss: Option<f64>,
}

impl PopularityBounds {
    pub fn params(&self) -> Params {
        Params::new()
            .with_opt("max_familiarity", self.max_familiarity)
            .with_opt("min_familiarity", self.min_familiarity)
            .with_opt("max_hotttnesss", self.max_hotttnesss)
            .with_opt("min_hotttnesss", self.min_hotttnesss)
    }
}

/// Artist search parameters.
#[derive(Debug, Clone, Default)]
pub struct ArtistQuery {
    pub name: Option<String>,
    pub description: Option<String>,
    pub results: Option<u32>,
    pub buckets: Vec<String>,
    /// Restrict results to the idspaces named in `buckets`.
    pub limit: bool,
    pub fuzzy_match: bool,
    pub sort: Option<String>,
    pub max_familiarity: Option<f64>,
    pub min_familiarity: Option<f64>,
    pub max_hotttnesss: Option<f64>,
    pub min_hotttnesss: Option<f64>,
}

impl ArtistQuery {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn params(&self) -> Params {
        let mut params = Params::new()
            .with_opt("name", self.name.as_deref())
            .with_opt("description", self.description.as_deref())
            .with_opt("results", self.results)
            .with_opt("sort", self.sort.as_deref())
            .with_opt("max_familiarity", self.max_familiarity)
            .with_opt("min_familiarity", self.min_familiarity)
            .with_opt("max_hotttnesss", self.max_hotttnesss)
            .with_opt("min_hotttnesss", self.min_hotttnesss);
        if !self.buckets.is_empty() {
            params.insert("bucket", self.buckets.clone());
        }
        if self.limit {
            params.insert("limit", true);
        }
        if self.fuzzy_match {
            params.insert("fuzzy_match", true);
        }
        params
    }
}

/// Search for artists by name, description or popularity bounds.
pub async fn search(client: &EchoNestClient, query: &ArtistQuery) -> Result<ResultList<Artist>> {
    let payload = client.get("artist/search", query.params()).await?;
    let artists = artists_from(client, &payload).await?;
    Ok(ResultList::new(artists, 0, None))
}

/// The hotttest artists right now.
pub async fn top_hottt(
    client: &EchoNestClient,
    page: Page,
    buckets: &[&str],
    limit: bool,
) -> Result<Vec<Artist>> {
    let mut params = page.params();
    if !buckets.is_empty() {
        params.insert("bucket", buckets);
    }
    if limit {
        params.insert("limit", true);
    }
    let payload = client.get("artist/top_hottt", params).await?;
    artists_from(client, &payload).await
}

/// The most used terms across all artists.
pub async fn top_terms(client: &EchoNestClient, results: Option<u32>) -> Result<Vec<Term>> {
    let payload = client
        .get("artist/top_terms", Params::new().with_opt("results", results))
        .await?;
    extract_as(&payload, "/terms")
}

/// Seeds and filters for [`similar`].
#[derive(Debug, Clone, Default)]
pub struct SimilarQuery {
    pub ids: Vec<String>,
    pub names: Vec<String>,
    pub page: Page,
    pub buckets: Vec<String>,
    pub limit: bool,
    pub bounds: PopularityBounds,
}

impl SimilarQuery {
    pub fn params(&self) -> Params {
        let mut params = self.page.params();
        if !self.ids.is_empty() {
            params.insert("id", self.ids.clone());
        }
        if !self.names.is_empty() {
            params.insert("name", self.names.clone());
        }
        params.extend(self.bounds.params());
        if !self.buckets.is_empty() {
            params.insert("bucket", self.buckets.clone());
        }
        if self.limit {
            params.insert("limit", true);
        }
        params
    }
}

/// Artists similar to a whole set of seed artists.
pub async fn similar(client: &EchoNestClient, query: &SimilarQuery) -> Result<Vec<Artist>> {
    if query.ids.is_empty() && query.names.is_empty() {
        return Err(EchoNestError::InvalidRequest(
            "similar artists need at least one seed id or name".into(),
        ));
    }
    let payload = client.get("artist/similar", query.params()).await?;
    artists_from(client, &payload).await
}

async fn artists_from(client: &EchoNestClient, payload: &Value) -> Result<Vec<Artist>> {
    let docs: Vec<Document> = extract_as(payload, "/artists")?;
    artists_from_docs(client, docs).await
}

async fn artists_from_docs(client: &EchoNestClient, docs: Vec<Document>) -> Result<Vec<Artist>> {
    let mut artists = Vec::with_capacity(docs.len());
    for doc in docs {
        artists.push(Artist::from_document(client.clone(), doc).await?);
    }
    Ok(artists)
}
