// SPDX-License-Identifier: GPL-3.0-or-later

//! Echo Nest API client.
//!
//! The core builds requests, enforces the client-side rate limit, decodes
//! JSON or XML response envelopes into a payload or a typed error, and backs
//! the entity types ([`Artist`], [`Song`], [`Catalog`], [`Playlist`],
//! [`Track`]) whose fields are fetched lazily and cached per parameter set.

pub mod artist;
pub mod catalog;
pub mod client;
pub mod error;
pub mod identifier;
pub mod models;
pub mod playlist;
pub mod proxy;
pub mod rate_limiter;
pub mod request;
pub mod response;
pub mod sandbox;
pub mod song;
#[cfg(test)]
mod test_support;
pub mod track;
pub mod transport;

pub use artist::{Artist, ArtistQuery, PopularityBounds, SimilarQuery};
pub use catalog::{Catalog, CatalogEntry, CatalogType};
pub use client::{EchoNestClient, EchoNestClientBuilder};
pub use error::{EchoNestError, Result};
pub use identifier::{classify, Identifier, IdentifierKind};
pub use models::{
    ArtistLocation, AudioSummary, CatalogProfile, Document, ForeignId, ResultList, Term,
    TermSort, TicketStatus,
};
pub use playlist::Playlist;
pub use proxy::{EntityProxy, Field, ObjectType, Page};
pub use rate_limiter::RateLimiter;
pub use request::{ParamValue, Params};
pub use response::Envelope;
pub use song::{Song, SongQuery};
pub use track::Track;
pub use transport::{HttpTransport, RawResponse, Transport};

pub use echonest_config::{EchoNestConfig, RateLimitMode, ResponseFormat};
