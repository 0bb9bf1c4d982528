// SPDX-License-Identifier: GPL-3.0-or-later

//! Catalogs (`catalog/*`): user-maintained collections of songs or artists.

use crate::artist::Artist;
use crate::client::EchoNestClient;
use crate::error::{EchoNestError, Result};
use crate::identifier::Identifier;
use crate::models::{CatalogItem, CatalogProfile, Document, ResultList, TicketStatus};
use crate::proxy::{extract, extract_as, take_string, EntityProxy, ObjectType, Page};
use crate::request::Params;
use crate::song::Song;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogType {
    Song,
    Artist,
}

impl CatalogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Song => "song",
            Self::Artist => "artist",
        }
    }
}

/// One entry read back from a catalog.
#[derive(Debug, Clone)]
pub enum CatalogEntry {
    Song {
        song: Song,
        /// The item as it was submitted in the update.
        request: Option<Value>,
    },
    Artist {
        artist: Artist,
        request: Option<Value>,
    },
    /// Not (yet) resolved to a song or an artist.
    Unresolved(CatalogItem),
}

#[derive(Debug, Clone)]
pub struct Catalog {
    proxy: EntityProxy,
    name: String,
    catalog_type: Option<String>,
}

impl Catalog {
    /// Open a catalog.
    ///
    /// An id always loads the existing catalog. A name loads the catalog of
    /// that name if it exists and has the requested type, and creates it
    /// otherwise; `kind` is required in that case.
    pub async fn open(
        client: EchoNestClient,
        identifier: impl Into<Identifier>,
        kind: Option<CatalogType>,
    ) -> Result<Self> {
        let identifier = identifier.into();
        let proxy = EntityProxy::new(client, ObjectType::Catalog, Some(identifier.clone()));

        let fields: Map<String, Value> = if identifier.is_id() {
            let payload = proxy.get_attribute("profile", Params::new()).await?;
            extract_as(&payload, "/catalog")?
        } else {
            let kind = kind.ok_or_else(|| {
                EchoNestError::InvalidRequest(format!("catalog {} needs a type", identifier))
            })?;

            match proxy.get_attribute("profile", Params::new()).await {
                Ok(payload) => {
                    let fields: Map<String, Value> = extract_as(&payload, "/catalog")?;
                    let existing = fields.get("type").and_then(Value::as_str).unwrap_or("unknown");
                    if existing != kind.as_str() {
                        return Err(EchoNestError::InvalidRequest(format!(
                            "catalog type requested ({}) does not match existing catalog type ({})",
                            kind.as_str(),
                            existing
                        )));
                    }
                    fields
                }
                Err(err @ (EchoNestError::Api { .. } | EchoNestError::InvalidId { .. })) => {
                    debug!(target: "echonest", "catalog {} not found ({}), creating it", identifier, err);
                    let params = Params::new().with("type", kind.as_str());
                    let payload = proxy.post_attribute("create", params, Params::new()).await?;
                    let mut fields = payload.as_object().cloned().unwrap_or_default();
                    fields
                        .entry("type")
                        .or_insert_with(|| Value::from(kind.as_str()));
                    fields
                }
                Err(err) => return Err(err),
            }
        };

        Self::from_proxy(proxy, fields)
    }

    /// Build a catalog from a listing entry without further calls.
    pub fn from_fields(
        client: EchoNestClient,
        identifier: impl Into<Identifier>,
        fields: Map<String, Value>,
    ) -> Result<Self> {
        let proxy = EntityProxy::new(client, ObjectType::Catalog, Some(identifier.into()));
        Self::from_proxy(proxy, fields)
    }

    fn from_proxy(mut proxy: EntityProxy, mut fields: Map<String, Value>) -> Result<Self> {
        let name = take_string(&mut fields, "name")?;
        if let Some(id) = fields.remove("id").as_ref().and_then(Value::as_str) {
            proxy.set_identifier(Identifier::parse(id));
        }
        let catalog_type = fields.get("type").and_then(Value::as_str).map(str::to_string);
        proxy.seed(fields);

        Ok(Self {
            proxy,
            name,
            catalog_type,
        })
    }

    pub fn id(&self) -> &str {
        self.proxy.identifier().map(Identifier::as_str).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catalog_type(&self) -> Option<&str> {
        self.catalog_type.as_deref()
    }

    /// Submit update items (see the catalog update documentation for the
    /// item format) and return the ticket to poll with [`Catalog::status`].
    pub async fn update<T: Serialize>(&self, items: &[T]) -> Result<String> {
        let data = serde_json::to_string(items)
            .map_err(|e| EchoNestError::InvalidRequest(format!("catalog items: {}", e)))?;
        let payload = self
            .proxy
            .post_attribute("update", Params::new(), Params::new().with("data", data))
            .await?;
        extract_as(&payload, "/ticket")
    }

    /// Progress of an update ticket. Tickets are global, so the catalog id
    /// is not sent.
    pub async fn status(&self, ticket: &str) -> Result<TicketStatus> {
        let payload = self
            .proxy
            .get_attribute_simple("status", Params::new().with("ticket", ticket))
            .await?;
        serde_json::from_value(payload)
            .map_err(|e| EchoNestError::InvalidResponse(format!("ticket status: {}", e)))
    }

    pub async fn profile(&self) -> Result<CatalogProfile> {
        let payload = self.proxy.get_attribute("profile", Params::new()).await?;
        extract_as(&payload, "/catalog")
    }

    /// Read a page of catalog entries, resolved to songs and artists where
    /// the service has matched them.
    pub async fn read_items(&self, page: Page, buckets: &[&str]) -> Result<ResultList<CatalogEntry>> {
        let mut params = page.params();
        if !buckets.is_empty() {
            params.insert("bucket", buckets);
        }
        let payload = self.proxy.get_attribute("read", params).await?;
        let docs: Vec<Document> = extract_as(&payload, "/catalog/items")?;
        let start: Option<u32> = extract_as(&payload, "/catalog/start").ok();
        let total: Option<u32> = extract_as(&payload, "/catalog/total").ok();

        let client = self.proxy.client();
        let mut entries = Vec::with_capacity(docs.len());
        for mut doc in docs {
            let entry = if let Some(id) = doc.remove("song_id") {
                let request = doc.remove("request");
                rename(&mut doc, "song_name", "title");
                let id = id.as_str().map(Identifier::parse).ok_or_else(|| {
                    EchoNestError::InvalidResponse("catalog song_id is not a string".into())
                })?;
                let song = Song::from_fields(client.clone(), id, doc).await?;
                CatalogEntry::Song { song, request }
            } else if let Some(id) = doc.remove("artist_id") {
                let request = doc.remove("request");
                rename(&mut doc, "artist_name", "name");
                let id = id.as_str().map(Identifier::parse).ok_or_else(|| {
                    EchoNestError::InvalidResponse("catalog artist_id is not a string".into())
                })?;
                let artist = Artist::from_fields(client.clone(), id, doc).await?;
                CatalogEntry::Artist { artist, request }
            } else {
                CatalogEntry::Unresolved(doc)
            };
            entries.push(entry);
        }

        Ok(ResultList::new(entries, start.unwrap_or(page.start), total))
    }

    /// Delete the whole catalog. Returns the service's confirmation record.
    pub async fn delete(&self) -> Result<Document> {
        let payload = self
            .proxy
            .post_attribute("delete", Params::new(), Params::new())
            .await?;
        Ok(payload.as_object().cloned().unwrap_or_default())
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn rename(doc: &mut Document, from: &str, to: &str) {
    if let Some(value) = doc.remove(from) {
        doc.insert(to.to_string(), value);
    }
}

/// Every catalog created with this API key.
pub async fn list(client: &EchoNestClient, page: Page) -> Result<ResultList<Catalog>> {
    let payload = client.get("catalog/list", page.params()).await?;
    let docs: Vec<Document> = extract_as(&payload, "/catalogs")?;
    let total = extract(&payload, "/total").ok().and_then(|v| v.as_u64()).map(|t| t as u32);

    let mut catalogs = Vec::with_capacity(docs.len());
    for doc in docs {
        let identifier = doc
            .get("id")
            .and_then(Value::as_str)
            .map(Identifier::parse)
            .ok_or_else(|| EchoNestError::InvalidResponse("catalog without id".into()))?;
        catalogs.push(Catalog::from_fields(client.clone(), identifier, doc)?);
    }
    Ok(ResultList::new(catalogs, page.start, total))
}
