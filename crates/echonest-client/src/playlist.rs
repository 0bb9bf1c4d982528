// SPDX-License-Identifier: GPL-3.0-or-later

//! Playlists: one-shot generation (`playlist/basic`, `playlist/static`) and
//! dynamic sessions (`playlist/dynamic/*`).
//!
//! A dynamic session lives on the service side. The local value only holds
//! its `session_id` and the songs returned by the last `next` call.

use crate::client::EchoNestClient;
use crate::error::Result;
use crate::models::Document;
use crate::proxy::{extract_as, take_string, EntityProxy, ObjectType};
use crate::request::Params;
use crate::song::{songs_from, songs_from_docs, Song};
use serde_json::{Map, Value};
use std::fmt;

const SONGS: &str = "songs";
const LOOKAHEAD: &str = "lookahead";

/// Generate a playlist in one call (artist or song radio).
///
/// Typical parameters are `type` (`artist-radio`, `song-radio`, ...),
/// `artist`/`artist_id`/`song_id` seeds and `results`.
pub async fn basic(client: &EchoNestClient, params: Params) -> Result<Vec<Song>> {
    let payload = client.get("playlist/basic", params).await?;
    songs_from(client, &payload, "/songs").await
}

/// Generate a playlist in one call with the full set of steering
/// parameters (tempo, energy, familiarity bounds, seed catalogs, ...).
pub async fn static_playlist(client: &EchoNestClient, params: Params) -> Result<Vec<Song>> {
    let payload = client.get("playlist/static", params).await?;
    songs_from(client, &payload, "/songs").await
}

/// A dynamic playlist session.
#[derive(Debug, Clone)]
pub struct Playlist {
    proxy: EntityProxy,
    session_id: String,
}

impl Playlist {
    /// Start a new session with the given seed and steering parameters.
    pub async fn create(client: EchoNestClient, params: Params) -> Result<Self> {
        let proxy = EntityProxy::new(client, ObjectType::Playlist, None);
        let payload = proxy.get_attribute("dynamic/create", params).await?;
        let mut fields: Map<String, Value> = payload.as_object().cloned().unwrap_or_default();
        let session_id = take_string(&mut fields, "session_id")?;

        let mut playlist = Self { proxy, session_id };
        playlist.proxy.seed(fields);
        Ok(playlist)
    }

    /// Continue an existing session. Makes no call.
    pub fn resume(client: EchoNestClient, session_id: impl Into<String>) -> Self {
        Self {
            proxy: EntityProxy::new(client, ObjectType::Playlist, None),
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn session(&self) -> Params {
        Params::new().with("session_id", self.session_id.as_str())
    }

    async fn call(&self, method: &str, params: Params) -> Result<Value> {
        let mut params = params;
        params.extend(self.session());
        self.proxy
            .get_attribute(&format!("dynamic/{}", method), params)
            .await
    }

    /// Advance the session and return the next songs. The returned songs and
    /// lookahead are remembered for [`Playlist::current_songs`] and
    /// [`Playlist::lookahead_songs`].
    pub async fn next_songs(
        &mut self,
        results: Option<u32>,
        lookahead: Option<u32>,
    ) -> Result<Vec<Song>> {
        let params = Params::new()
            .with_opt("results", results)
            .with_opt("lookahead", lookahead);
        let payload = self.call("next", params).await?;
        let songs: Vec<Document> = extract_as(&payload, "/songs")?;
        let ahead: Vec<Document> = extract_as(&payload, "/lookahead").unwrap_or_default();
        self.remember(songs.clone(), ahead);
        songs_from_docs(self.proxy.client(), songs).await
    }

    /// The songs from the last `next` call. Fetches one song if the session
    /// has not been advanced yet.
    pub async fn current_songs(&mut self) -> Result<Vec<Song>> {
        if self.proxy.cached(SONGS).is_none() {
            return self.next_songs(Some(1), None).await;
        }
        let docs = self.cached_docs(SONGS);
        songs_from_docs(self.proxy.client(), docs).await
    }

    /// Songs the service expects to play after the current ones.
    pub async fn lookahead_songs(&self) -> Result<Vec<Song>> {
        let docs = self.cached_docs(LOOKAHEAD);
        songs_from_docs(self.proxy.client(), docs).await
    }

    pub async fn info(&self) -> Result<Document> {
        let payload = self.call("info", Params::new()).await?;
        Ok(payload.as_object().cloned().unwrap_or_default())
    }

    /// Adjust the session (target tempo, `more_like_this`, ...). Lookahead
    /// songs are stale afterwards.
    pub async fn steer(&mut self, params: Params) -> Result<()> {
        self.call("steer", params).await?;
        self.clear_lookahead();
        Ok(())
    }

    /// Report listener feedback (`ban_artist`, `skip_song`, `rate_song`, ...).
    pub async fn feedback(&mut self, params: Params) -> Result<()> {
        self.call("feedback", params).await?;
        self.clear_lookahead();
        Ok(())
    }

    /// Restart the session with new seeds, keeping its history.
    pub async fn restart(&mut self, params: Params) -> Result<Document> {
        let payload = self.call("restart", params).await?;
        self.proxy.clear_cache();
        Ok(payload.as_object().cloned().unwrap_or_default())
    }

    pub async fn delete(self) -> Result<()> {
        self.call("delete", Params::new()).await?;
        Ok(())
    }

    fn remember(&mut self, songs: Vec<Document>, lookahead: Vec<Document>) {
        let mut fields = Map::new();
        fields.insert(SONGS.into(), docs_value(songs));
        fields.insert(LOOKAHEAD.into(), docs_value(lookahead));
        self.proxy.seed(fields);
    }

    fn clear_lookahead(&mut self) {
        let mut fields = Map::new();
        fields.insert(LOOKAHEAD.into(), Value::Array(Vec::new()));
        self.proxy.seed(fields);
    }

    fn cached_docs(&self, name: &str) -> Vec<Document> {
        match self.proxy.cached(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn docs_value(docs: Vec<Document>) -> Value {
    Value::Array(docs.into_iter().map(Value::Object).collect())
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dynamic Playlist - {}", self.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{client_with, StubTransport};
    use serde_json::json;

    fn song(id: &str, title: &str) -> Value {
        json!({
            "id": id,
            "title": title,
            "artist_name": "The National",
            "artist_id": "ARH6W4X1187B99274F"
        })
    }

    #[tokio::test]
    async fn create_starts_session() {
        let stub = StubTransport::json(json!({"session_id": "6a1d7c4b0f0d4b1c"}));
        let params = Params::new()
            .with("type", "artist-radio")
            .with("artist", "the national");
        let playlist = Playlist::create(client_with(&stub), params).await.unwrap();

        assert_eq!(playlist.session_id(), "6a1d7c4b0f0d4b1c");
        let url = stub.last_url().unwrap();
        assert!(url.contains("/playlist/dynamic/create?"), "{url}");
        assert!(url.contains("type=artist-radio"), "{url}");
    }

    #[tokio::test]
    async fn next_songs_remember_current_and_lookahead() {
        let stub = StubTransport::json(json!({
            "songs": [song("SOCZMFK12AC468668F", "Fake Empire")],
            "lookahead": [song("SOBHTJM12A6D4F9A4E", "Bloodbuzz Ohio")]
        }));
        let mut playlist = Playlist::resume(client_with(&stub), "6a1d7c4b0f0d4b1c");

        let songs = playlist.next_songs(Some(1), Some(1)).await.unwrap();
        assert_eq!(songs[0].title(), "Fake Empire");
        let url = stub.last_url().unwrap();
        assert!(url.contains("/playlist/dynamic/next?"), "{url}");
        assert!(url.contains("session_id=6a1d7c4b0f0d4b1c"), "{url}");
        assert!(url.contains("lookahead=1"), "{url}");

        let current = playlist.current_songs().await.unwrap();
        assert_eq!(current[0].title(), "Fake Empire");
        let ahead = playlist.lookahead_songs().await.unwrap();
        assert_eq!(ahead[0].title(), "Bloodbuzz Ohio");
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn current_songs_fetch_one_when_fresh() {
        let stub = StubTransport::json(json!({
            "songs": [song("SOCZMFK12AC468668F", "Fake Empire")],
            "lookahead": []
        }));
        let mut playlist = Playlist::resume(client_with(&stub), "6a1d7c4b0f0d4b1c");

        let current = playlist.current_songs().await.unwrap();
        assert_eq!(current.len(), 1);
        assert!(stub.last_url().unwrap().contains("results=1"));
    }

    #[tokio::test]
    async fn steer_drops_lookahead() {
        let stub = StubTransport::json(json!({
            "songs": [song("SOCZMFK12AC468668F", "Fake Empire")],
            "lookahead": [song("SOBHTJM12A6D4F9A4E", "Bloodbuzz Ohio")]
        }));
        let mut playlist = Playlist::resume(client_with(&stub), "6a1d7c4b0f0d4b1c");
        playlist.next_songs(None, Some(1)).await.unwrap();

        playlist
            .steer(Params::new().with("target_tempo", 120))
            .await
            .unwrap();
        assert!(playlist.lookahead_songs().await.unwrap().is_empty());
        assert!(stub.last_url().unwrap().contains("/playlist/dynamic/steer?"));
    }

    #[tokio::test]
    async fn basic_returns_songs() {
        let stub = StubTransport::json(json!({"songs": [song("SOCZMFK12AC468668F", "Fake Empire")]}));
        let client = client_with(&stub);
        let params = Params::new()
            .with("type", "artist-radio")
            .with("artist", "the national");

        let songs = basic(&client, params).await.unwrap();
        assert_eq!(songs.len(), 1);
        assert!(stub.last_url().unwrap().contains("/playlist/basic?"));

        static_playlist(&client, Params::new().with("type", "artist"))
            .await
            .unwrap();
        assert!(stub.last_url().unwrap().contains("/playlist/static?"));
    }
}
