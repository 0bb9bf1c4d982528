// SPDX-License-Identifier: GPL-3.0-or-later

//! Songs (`song/*`).

use crate::client::EchoNestClient;
use crate::error::{EchoNestError, Result};
use crate::identifier::Identifier;
use crate::models::{ArtistLocation, AudioSummary, Document, ResultList};
use crate::proxy::{extract_as, take_string, EntityProxy, Field, ObjectType};
use crate::request::Params;
use serde_json::{Map, Value};
use std::fmt;

const AUDIO_SUMMARY: Field = Field::bucketed(
    "audio_summary",
    "profile",
    "audio_summary",
    "/songs/0/audio_summary",
);
const SONG_HOTTTNESSS: Field = Field::bucketed(
    "song_hotttnesss",
    "profile",
    "song_hotttnesss",
    "/songs/0/song_hotttnesss",
);
const ARTIST_HOTTTNESSS: Field = Field::bucketed(
    "artist_hotttnesss",
    "profile",
    "artist_hotttnesss",
    "/songs/0/artist_hotttnesss",
);
const ARTIST_FAMILIARITY: Field = Field::bucketed(
    "artist_familiarity",
    "profile",
    "artist_familiarity",
    "/songs/0/artist_familiarity",
);
const ARTIST_LOCATION: Field = Field::bucketed(
    "artist_location",
    "profile",
    "artist_location",
    "/songs/0/artist_location",
);

const CORE_FIELDS: [&str; 3] = ["title", "artist_name", "artist_id"];

/// A song. Its core attributes are fetched eagerly; everything else on demand.
#[derive(Debug, Clone)]
pub struct Song {
    proxy: EntityProxy,
    title: String,
    artist_name: String,
    artist_id: String,
}

impl Song {
    pub async fn new(client: EchoNestClient, id: impl Into<Identifier>) -> Result<Self> {
        Self::with_buckets(client, id, &[]).await
    }

    /// Look up a song and fetch the given buckets with its profile.
    pub async fn with_buckets(
        client: EchoNestClient,
        id: impl Into<Identifier>,
        buckets: &[&str],
    ) -> Result<Self> {
        Self::build(client, id.into(), Map::new(), buckets).await
    }

    /// Build a song from data already at hand, fetching `song/profile` only
    /// when a core attribute is missing.
    pub async fn from_fields(
        client: EchoNestClient,
        id: impl Into<Identifier>,
        fields: Map<String, Value>,
    ) -> Result<Self> {
        Self::build(client, id.into(), fields, &[]).await
    }

    async fn build(
        client: EchoNestClient,
        id: Identifier,
        mut fields: Map<String, Value>,
        buckets: &[&str],
    ) -> Result<Self> {
        let proxy = EntityProxy::new(client, ObjectType::Song, Some(id));

        if !CORE_FIELDS.iter().all(|key| fields.contains_key(*key)) {
            let mut params = Params::new();
            if !buckets.is_empty() {
                params.insert("bucket", buckets);
            }
            let payload = proxy.get_attribute("profile", params).await?;
            let profile: Map<String, Value> = extract_as(&payload, "/songs/0")?;
            fields.extend(profile);
        }

        let title = take_string(&mut fields, "title")?;
        let artist_name = take_string(&mut fields, "artist_name")?;
        let artist_id = take_string(&mut fields, "artist_id")?;
        fields.remove("id");

        let mut song = Self {
            proxy,
            title,
            artist_name,
            artist_id,
        };
        song.proxy.seed(fields);
        Ok(song)
    }

    pub(crate) async fn from_document(client: EchoNestClient, mut doc: Document) -> Result<Self> {
        let id = match doc.get("id").and_then(Value::as_str) {
            Some(id) => Identifier::parse(id),
            None => return Err(EchoNestError::InvalidResponse("song without id".into())),
        };
        doc.remove("request");
        Self::from_fields(client, id, doc).await
    }

    pub fn id(&self) -> &str {
        self.proxy.identifier().map(Identifier::as_str).unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist_name(&self) -> &str {
        &self.artist_name
    }

    pub fn artist_id(&self) -> &str {
        &self.artist_id
    }

    pub fn proxy(&self) -> &EntityProxy {
        &self.proxy
    }

    pub async fn audio_summary(&mut self) -> Result<AudioSummary> {
        self.proxy.resolve(&AUDIO_SUMMARY, Params::new()).await
    }

    pub async fn song_hotttnesss(&mut self) -> Result<f64> {
        self.proxy.resolve(&SONG_HOTTTNESSS, Params::new()).await
    }

    pub async fn artist_hotttnesss(&mut self) -> Result<f64> {
        self.proxy.resolve(&ARTIST_HOTTTNESSS, Params::new()).await
    }

    pub async fn artist_familiarity(&mut self) -> Result<f64> {
        self.proxy.resolve(&ARTIST_FAMILIARITY, Params::new()).await
    }

    pub async fn artist_location(&mut self) -> Result<ArtistLocation> {
        self.proxy.resolve(&ARTIST_LOCATION, Params::new()).await
    }

    /// Tracks of this song in the `catalog` idspace (e.g. `7digital-US`).
    /// With `limit`, the service only answers for songs it has tracks for.
    /// Not cached.
    pub async fn tracks(&self, catalog: &str, limit: bool) -> Result<Vec<Document>> {
        let buckets = vec!["tracks".to_string(), format!("id:{}", catalog)];
        let mut params = Params::new().with("bucket", buckets);
        if limit {
            params.insert("limit", true);
        }
        let payload = self.proxy.get_attribute("profile", params).await?;
        match payload.pointer("/songs/0/tracks") {
            Some(tracks) => serde_json::from_value(tracks.clone())
                .map_err(|e| EchoNestError::InvalidResponse(format!("tracks: {}", e))),
            None => Ok(Vec::new()),
        }
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist_name, self.title)
    }
}

/// Song search parameters. Numeric bounds left as `None` are not sent.
#[derive(Debug, Clone, Default)]
pub struct SongQuery {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub artist_id: Option<String>,
    pub combined: Option<String>,
    pub description: Option<String>,
    pub results: Option<u32>,
    pub max_tempo: Option<f64>,
    pub min_tempo: Option<f64>,
    pub max_duration: Option<f64>,
    pub min_duration: Option<f64>,
    pub max_loudness: Option<f64>,
    pub min_loudness: Option<f64>,
    pub artist_max_familiarity: Option<f64>,
    pub artist_min_familiarity: Option<f64>,
    pub artist_max_hotttnesss: Option<f64>,
    pub artist_min_hotttnesss: Option<f64>,
    pub song_max_hotttnesss: Option<f64>,
    pub song_min_hotttnesss: Option<f64>,
    pub mode: Option<i32>,
    pub key: Option<i32>,
    pub sort: Option<String>,
    pub buckets: Vec<String>,
    pub limit: bool,
}

impl SongQuery {
    pub fn params(&self) -> Params {
        let mut params = Params::new()
            .with_opt("title", self.title.as_deref())
            .with_opt("artist", self.artist.as_deref())
            .with_opt("artist_id", self.artist_id.as_deref())
            .with_opt("combined", self.combined.as_deref())
            .with_opt("description", self.description.as_deref())
            .with_opt("results", self.results)
            .with_opt("max_tempo", self.max_tempo)
            .with_opt("min_tempo", self.min_tempo)
            .with_opt("max_duration", self.max_duration)
            .with_opt("min_duration", self.min_duration)
            .with_opt("max_loudness", self.max_loudness)
            .with_opt("min_loudness", self.min_loudness)
            .with_opt("artist_max_familiarity", self.artist_max_familiarity)
            .with_opt("artist_min_familiarity", self.artist_min_familiarity)
            .with_opt("artist_max_hotttnesss", self.artist_max_hotttnesss)
            .with_opt("artist_min_hotttnesss", self.artist_min_hotttnesss)
            .with_opt("song_max_hotttnesss", self.song_max_hotttnesss)
            .with_opt("song_min_hotttnesss", self.song_min_hotttnesss)
            .with_opt("mode", self.mode)
            .with_opt("key", self.key)
            .with_opt("sort", self.sort.as_deref());
        if !self.buckets.is_empty() {
            params.insert("bucket", self.buckets.clone());
        }
        if self.limit {
            params.insert("limit", true);
        }
        params
    }
}

/// Search for songs.
pub async fn search(client: &EchoNestClient, query: &SongQuery) -> Result<ResultList<Song>> {
    let payload = client.get("song/search", query.params()).await?;
    songs_from(client, &payload, "/songs").await.map(|songs| ResultList::new(songs, 0, None))
}

/// Profiles of several songs in one call.
pub async fn profile(
    client: &EchoNestClient,
    ids: &[&str],
    buckets: &[&str],
    limit: bool,
) -> Result<Vec<Song>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut params = Params::new().with("id", ids);
    if !buckets.is_empty() {
        params.insert("bucket", buckets);
    }
    if limit {
        params.insert("limit", true);
    }
    let payload = client.get("song/profile", params).await?;
    songs_from(client, &payload, "/songs").await
}

/// Build every song listed at `pointer`.
pub(crate) async fn songs_from(
    client: &EchoNestClient,
    payload: &Value,
    pointer: &str,
) -> Result<Vec<Song>> {
    let docs: Vec<Document> = extract_as(payload, pointer)?;
    songs_from_docs(client, docs).await
}

pub(crate) async fn songs_from_docs(client: &EchoNestClient, docs: Vec<Document>) -> Result<Vec<Song>> {
    let mut songs = Vec::with_capacity(docs.len());
    for doc in docs {
        songs.push(Song::from_document(client.clone(), doc).await?);
    }
    Ok(songs)
}
