use super::Metadata;
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

#[derive(Default)]
struct Entries {
    data: HashMap<i64, (Metadata, Instant)>,
    order: VecDeque<i64>,
}

/// Fetched metadata cache with a TTL and an entry limit
///
/// When full, the oldest insertion is evicted first.
#[derive(Clone)]
pub struct MetadataCache {
    entries: Arc<RwLock<Entries>>,
    ttl: Duration,
    limit: usize,
}

impl MetadataCache {
    /// Create a cache holding at most `limit` entries, `0` disables it
    #[must_use]
    pub fn new(limit: usize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries::default())),
            ttl,
            limit,
        }
    }

    /// Get cached metadata if still valid
    pub async fn get(&self, id: i64) -> Option<Metadata> {
        let entries = self.entries.read().await;
        if let Some((metadata, stored)) = entries.data.get(&id)
            && stored.elapsed() < self.ttl
        {
            return Some(metadata.clone());
        }
        drop(entries);
        None
    }

    /// Store metadata, evicting the oldest entries over the limit
    pub async fn set(&self, metadata: Metadata) {
        if self.limit == 0 {
            return;
        }

        let mut entries = self.entries.write().await;
        let id = metadata.id;
        if entries.data.insert(id, (metadata, Instant::now())).is_none() {
            entries.order.push_back(id);
        }

        while entries.data.len() > self.limit {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.data.remove(&oldest);
        }
    }

    /// Clear expired entries, returns how many were dropped
    pub async fn cleanup(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.data.len();
        let ttl = self.ttl;
        entries.data.retain(|_, (_, stored)| stored.elapsed() < ttl);
        let Entries { data, order } = &mut *entries;
        order.retain(|id| data.contains_key(id));
        before - data.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.data.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
