// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::Deref;

/// A free-form record (biography, blog post, image, news item, ...).
pub type Document = Map<String, Value>;

/// One page of results plus where it sits in the full result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultList<T> {
    pub items: Vec<T>,
    /// Offset of the first item.
    pub start: u32,
    /// Total matches on the service side; the page length when not reported.
    pub total: u32,
}

impl<T> ResultList<T> {
    pub fn new(items: Vec<T>, start: u32, total: Option<u32>) -> Self {
        let total = total.unwrap_or(items.len() as u32);
        Self {
            items,
            start,
            total,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ResultList<U> {
        ResultList {
            items: self.items.into_iter().map(f).collect(),
            start: self.start,
            total: self.total,
        }
    }
}

impl<T> Deref for ResultList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> IntoIterator for ResultList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// A descriptive term attached to an artist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Term {
    pub name: String,
    #[serde(default)]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Sort order for artist terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TermSort {
    #[default]
    Weight,
    Frequency,
}

impl TermSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Frequency => "frequency",
        }
    }
}

/// Mapping from an external catalog to the entity's id there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignId {
    pub catalog: String,
    pub foreign_id: String,
}

/// Acoustic summary of a song or track.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AudioSummary {
    /// Estimated key, 0 (C) through 11 (B).
    #[serde(default)]
    pub key: Option<i32>,
    /// 1 for major, 0 for minor.
    #[serde(default)]
    pub mode: Option<i32>,
    /// Beats per minute.
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub time_signature: Option<i32>,
    /// Length in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Overall loudness in dB.
    #[serde(default)]
    pub loudness: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub danceability: Option<f64>,
    /// Where the full analysis document can be downloaded.
    #[serde(default)]
    pub analysis_url: Option<String>,
}

/// Where an artist is based.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArtistLocation {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Summary of a catalog as returned by `catalog/profile`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogProfile {
    pub id: String,
    pub name: String,
    /// `song` or `artist`.
    #[serde(rename = "type", default)]
    pub catalog_type: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub resolved: Option<u64>,
    #[serde(default)]
    pub pending_tickets: Vec<Value>,
}

/// Progress of a catalog update ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketStatus {
    /// `pending`, `complete` or `error`.
    pub ticket_status: String,
    #[serde(default)]
    pub total_items: Option<u64>,
    #[serde(default)]
    pub items_updated: Option<u64>,
    #[serde(default)]
    pub update_info: Vec<Value>,
}

impl TicketStatus {
    pub fn is_complete(&self) -> bool {
        self.ticket_status.eq_ignore_ascii_case("complete")
    }
}

/// A catalog entry that could not be resolved to an artist or a song.
pub type CatalogItem = Document;
