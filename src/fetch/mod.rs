//! Remote catalog access
//!
//! - `http` - gallery API client
//! - `cache` - bounded TTL cache of fetched metadata

pub mod cache;
pub mod http;

pub use cache::MetadataCache;
pub use http::HttpFetcher;

use crate::store::{SauceRecord, Tag};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Localized titles of a catalog item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Title {
    pub english: Option<String>,
    pub japanese: Option<String>,
    pub pretty: Option<String>,
}

impl Title {
    /// Display title: pretty, then english, then japanese
    #[must_use]
    pub fn display(&self) -> String {
        [&self.pretty, &self.english, &self.japanese]
            .into_iter()
            .flatten()
            .map(|title| title.trim().trim_matches('"').trim())
            .find(|title| !title.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

/// Metadata of one catalog item as returned by the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub id: i64,
    pub title: Title,
    pub uploaded_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
    pub pages: i64,
    pub favorites: i64,
}

impl From<&Metadata> for SauceRecord {
    fn from(metadata: &Metadata) -> Self {
        Self {
            id: metadata.id,
            title: metadata.title.display(),
            uploaded: metadata.uploaded_at.timestamp(),
            tags: metadata.tags.clone(),
            pages: metadata.pages,
            favorites: metadata.favorites,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Worth retrying: network failures, timeouts, rate limits, server errors
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("request rejected with status {0}")]
    Rejected(u16),
}

impl FetchError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Short label used for metrics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Malformed(_) => "malformed",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// Retrieval service the indexer pulls metadata from
///
/// `Ok(None)` means the id does not exist, the end of the catalog.
pub trait Fetch: Send + Sync {
    fn fetch(&self, id: i64) -> impl Future<Output = Result<Option<Metadata>, FetchError>> + Send;

    /// Drop stale state, the indexer calls it before every batch
    fn prune(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}
