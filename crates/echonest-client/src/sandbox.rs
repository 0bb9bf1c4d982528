// SPDX-License-Identifier: GPL-3.0-or-later

//! Sandboxes (`sandbox/*`): partner asset collections.
//!
//! Only listing is supported. Downloading assets (`sandbox/access`) needs
//! OAuth-signed requests, which this client does not make.

use crate::client::EchoNestClient;
use crate::error::Result;
use crate::models::{Document, ResultList};
use crate::proxy::{extract, extract_as, Page};
use crate::request::Params;

/// List the assets available in `sandbox`.
pub async fn list(client: &EchoNestClient, sandbox: &str, page: Page) -> Result<ResultList<Document>> {
    let params = Params::new()
        .with("sandbox", sandbox)
        .with("results", page.results)
        .with("start", page.start);
    let payload = client.get("sandbox/list", params).await?;

    let assets: Vec<Document> = extract_as(&payload, "/assets")?;
    let start = extract(&payload, "/start")
        .ok()
        .and_then(|v| v.as_u64())
        .map_or(page.start, |s| s as u32);
    let total = extract(&payload, "/total").ok().and_then(|v| v.as_u64()).map(|t| t as u32);
    Ok(ResultList::new(assets, start, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{client_with, StubTransport};
    use serde_json::json;

    #[tokio::test]
    async fn list_returns_assets_with_paging() {
        let stub = StubTransport::json(json!({
            "assets": [
                {"id": "bbe4d1ee1a8c1e1e6e9b9a1b1f4f4d2e", "filename": "track01.mp3"},
                {"id": "3e1d0d1d6c0c7e0b2f6f9a9c5e5d1b3a", "filename": "track02.mp3"}
            ],
            "start": 30,
            "total": 117
        }));

        let assets = list(&client_with(&stub), "bluenote", Page::new(2, 30))
            .await
            .unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets.start, 30);
        assert_eq!(assets.total, 117);
        assert_eq!(assets[1]["filename"], "track02.mp3");

        let url = stub.last_url().unwrap();
        assert!(url.contains("/sandbox/list?"), "{url}");
        assert!(url.contains("sandbox=bluenote"), "{url}");
        assert!(url.contains("results=2"), "{url}");
        assert!(url.contains("start=30"), "{url}");
    }

    #[tokio::test]
    async fn default_page_is_sent_explicitly() {
        let stub = StubTransport::json(json!({"assets": [], "start": 0, "total": 0}));
        let assets = list(&client_with(&stub), "bluenote", Page::default())
            .await
            .unwrap();
        assert!(assets.is_empty());

        let url = stub.last_url().unwrap();
        assert!(url.contains("results=15"), "{url}");
        assert!(url.contains("start=0"), "{url}");
    }
}
