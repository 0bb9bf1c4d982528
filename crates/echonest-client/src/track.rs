// SPDX-License-Identifier: GPL-3.0-or-later

//! Analyzed tracks (`track/*`).
//!
//! Tracks are created by uploading audio (bytes or a URL) or by looking up an
//! earlier analysis by id or MD5. Every call asks for the `audio_summary`
//! bucket, and uploads wait for the analysis to finish.

use crate::client::EchoNestClient;
use crate::error::{EchoNestError, Result};
use crate::identifier::Identifier;
use crate::models::{AudioSummary, Document};
use crate::proxy::{extract_as, take_string, EntityProxy, ObjectType};
use crate::request::Params;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Track {
    proxy: EntityProxy,
    md5: Option<String>,
    audio_summary: AudioSummary,
}

impl Track {
    /// Upload audio bytes for analysis. Uses the upload timeout.
    pub async fn upload(client: EchoNestClient, audio: Vec<u8>, filetype: &str) -> Result<Self> {
        let params = analysis_params().with("filetype", filetype).with("wait", true);
        let payload = client
            .upload(&ObjectType::Track.method_path("upload"), params, audio)
            .await?;
        Self::from_payload(client, payload)
    }

    /// Upload a local file; the file type defaults to the extension.
    pub async fn from_file(
        client: EchoNestClient,
        path: impl AsRef<Path>,
        filetype: Option<&str>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let filetype = filetype
            .or_else(|| path.extension().and_then(|e| e.to_str()))
            .ok_or_else(|| {
                EchoNestError::InvalidRequest(format!("cannot tell file type of {}", path.display()))
            })?
            .to_string();
        let audio = tokio::fs::read(path)
            .await
            .map_err(|e| EchoNestError::InvalidRequest(format!("{}: {}", path.display(), e)))?;
        debug!(target: "echonest", "uploading {} ({} bytes)", path.display(), audio.len());
        Self::upload(client, audio, &filetype).await
    }

    /// Have the service fetch and analyze audio from a URL.
    pub async fn from_url(client: EchoNestClient, url: &str) -> Result<Self> {
        let params = analysis_params().with("url", url).with("wait", true);
        let payload = client
            .post_long(&ObjectType::Track.method_path("upload"), params, Params::new())
            .await?;
        Self::from_payload(client, payload)
    }

    pub async fn from_id(client: EchoNestClient, id: &str) -> Result<Self> {
        Self::profile(client, analysis_params().with("id", id)).await
    }

    pub async fn from_md5(client: EchoNestClient, md5: &str) -> Result<Self> {
        Self::profile(client, analysis_params().with("md5", md5)).await
    }

    /// Run the analysis again for a track already known by id.
    pub async fn reanalyze_id(client: EchoNestClient, id: &str) -> Result<Self> {
        Self::analyze(client, analysis_params().with("id", id)).await
    }

    pub async fn reanalyze_md5(client: EchoNestClient, md5: &str) -> Result<Self> {
        Self::analyze(client, analysis_params().with("md5", md5)).await
    }

    async fn profile(client: EchoNestClient, params: Params) -> Result<Self> {
        let payload = client
            .get(&ObjectType::Track.method_path("profile"), params)
            .await?;
        Self::from_payload(client, payload)
    }

    async fn analyze(client: EchoNestClient, params: Params) -> Result<Self> {
        let payload = client
            .post_long(
                &ObjectType::Track.method_path("analyze"),
                params.with("wait", true),
                Params::new(),
            )
            .await?;
        Self::from_payload(client, payload)
    }

    /// Build a track from a `{"track": {...}}` payload. Only a complete
    /// analysis yields a track.
    fn from_payload(client: EchoNestClient, payload: Value) -> Result<Self> {
        let mut track: Document = extract_as(&payload, "/track")?;

        let status = track
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        match status.as_str() {
            "complete" => {}
            "pending" => {
                return Err(EchoNestError::InvalidResponse(
                    "the track is still being analyzed".into(),
                ))
            }
            "error" => {
                return Err(EchoNestError::InvalidResponse(
                    "there was an error analyzing the track".into(),
                ))
            }
            other => {
                return Err(EchoNestError::InvalidResponse(format!(
                    "unexpected track status {:?}",
                    other
                )))
            }
        }

        let id = take_string(&mut track, "id")?;
        // Tracks reached through song calls carry no md5.
        let md5 = track
            .remove("md5")
            .and_then(|v| v.as_str().map(str::to_string));
        let audio_summary = match track.remove("audio_summary") {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| EchoNestError::InvalidResponse(format!("audio_summary: {}", e)))?,
            None => AudioSummary::default(),
        };

        let mut proxy = EntityProxy::new(client, ObjectType::Track, Some(Identifier::parse(id)));
        proxy.seed(track);

        Ok(Self {
            proxy,
            md5,
            audio_summary,
        })
    }

    pub fn id(&self) -> &str {
        self.proxy.identifier().map(Identifier::as_str).unwrap_or_default()
    }

    pub fn md5(&self) -> Option<&str> {
        self.md5.as_deref()
    }

    pub fn audio_summary(&self) -> &AudioSummary {
        &self.audio_summary
    }

    /// Where the full analysis document can be downloaded.
    pub fn analysis_url(&self) -> Option<&str> {
        self.audio_summary.analysis_url.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.property("title").and_then(Value::as_str)
    }

    pub fn artist(&self) -> Option<&str> {
        self.property("artist").and_then(Value::as_str)
    }

    /// Any other field the service returned (`bitrate`, `samplerate`, ...).
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.proxy.cached(name)
    }
}

fn analysis_params() -> Params {
    Params::new().with("bucket", "audio_summary")
}
