use super::{Fetch, FetchError, Metadata, MetadataCache, Title};
use crate::{config::FetchConfig, metrics::FETCH_DURATION, store::Tag};
use anyhow::{Context, Result};
use chrono::DateTime;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct GalleryTitle {
    english: Option<String>,
    japanese: Option<String>,
    pretty: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GalleryTag {
    #[serde(rename = "type")]
    kind: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Gallery {
    id: i64,
    title: GalleryTitle,
    upload_date: i64,
    #[serde(default)]
    tags: Vec<GalleryTag>,
    num_pages: i64,
    #[serde(default)]
    num_favorites: i64,
}

impl TryFrom<Gallery> for Metadata {
    type Error = FetchError;

    fn try_from(gallery: Gallery) -> Result<Self, Self::Error> {
        let uploaded_at = DateTime::from_timestamp(gallery.upload_date, 0).ok_or_else(|| {
            FetchError::Malformed(format!("upload date out of range: {}", gallery.upload_date))
        })?;

        Ok(Self {
            id: gallery.id,
            title: Title {
                english: gallery.title.english,
                japanese: gallery.title.japanese,
                pretty: gallery.title.pretty,
            },
            uploaded_at,
            tags: gallery
                .tags
                .into_iter()
                .map(|tag| Tag::new(tag.kind, tag.name))
                .collect(),
            pages: gallery.num_pages,
            favorites: gallery.num_favorites,
        })
    }
}

/// Map an HTTP status to a fetch outcome, `Ok(None)` for not found
fn classify(status: StatusCode) -> Result<Option<()>, FetchError> {
    match status {
        StatusCode::NOT_FOUND => Ok(None),
        s if s.is_success() => Ok(Some(())),
        s if s == StatusCode::TOO_MANY_REQUESTS
            || s == StatusCode::REQUEST_TIMEOUT
            || s.is_server_error() =>
        {
            Err(FetchError::Transient(format!("status {s}")))
        }
        s => Err(FetchError::Rejected(s.as_u16())),
    }
}

/// Gallery API client, `GET {base_url}/api/gallery/{id}`
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    cache: MetadataCache,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache: MetadataCache::new(config.cache_limit, config.cache_ttl),
        })
    }

    #[must_use]
    pub fn gallery_url(&self, id: i64) -> String {
        format!("{}/api/gallery/{id}", self.base_url)
    }

    #[must_use]
    pub const fn cache(&self) -> &MetadataCache {
        &self.cache
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, id: i64) -> Result<Option<Metadata>, FetchError> {
        if let Some(cached) = self.cache.get(id).await {
            return Ok(Some(cached));
        }

        let url = self.gallery_url(id);
        let timer = Instant::now();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| FetchError::Transient(err.to_string()))?;
        FETCH_DURATION.observe(timer.elapsed().as_secs_f64());

        debug!(id, status = %response.status(), "fetched");

        if classify(response.status())?.is_none() {
            return Ok(None);
        }

        let gallery: Gallery = response.json().await.map_err(|err| {
            if err.is_decode() {
                FetchError::Malformed(err.to_string())
            } else {
                FetchError::Transient(err.to_string())
            }
        })?;
        let metadata = Metadata::try_from(gallery)?;

        self.cache.set(metadata.clone()).await;

        Ok(Some(metadata))
    }

    async fn prune(&self) {
        let expired = self.cache.cleanup().await;
        if expired > 0 {
            debug!(expired, "cache entries expired");
        }
    }
}
