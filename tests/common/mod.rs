#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::DateTime;
use saucedb::{
    fetch::{Fetch, FetchError, Metadata, Title},
    indexer::IndexOptions,
    store::{CursorMode, SauceRecord, SauceStore, Tag},
};
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

/// What the scripted catalog answers for one id
#[derive(Debug, Clone)]
pub enum Script {
    Found,
    NotFound,
    /// Transient failures before the item is found
    Flaky(u32),
    AlwaysTransient,
    Malformed,
}

/// In-memory catalog, ids up to `last` exist unless scripted otherwise
pub struct ScriptedFetcher {
    last: i64,
    scripts: HashMap<i64, Script>,
    attempts: Mutex<HashMap<i64, u32>>,
    calls: AtomicUsize,
    prunes: AtomicUsize,
    delay: Duration,
}

impl ScriptedFetcher {
    pub fn catalog(last: i64) -> Self {
        Self {
            last,
            scripts: HashMap::new(),
            attempts: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            prunes: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn script(mut self, id: i64, script: Script) -> Self {
        self.scripts.insert(id, script);
        self
    }

    /// Every fetch waits this long before answering
    pub const fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prunes(&self) -> usize {
        self.prunes.load(Ordering::SeqCst)
    }

    pub fn attempts(&self, id: i64) -> u32 {
        self.attempts.lock().unwrap().get(&id).copied().unwrap_or(0)
    }
}

impl Fetch for ScriptedFetcher {
    async fn fetch(&self, id: i64) -> Result<Option<Metadata>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let attempt = attempts.entry(id).or_insert(0);
            *attempt += 1;
            *attempt
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let script = self.scripts.get(&id).cloned().unwrap_or(if id <= self.last {
            Script::Found
        } else {
            Script::NotFound
        });

        match script {
            Script::Found => Ok(Some(metadata(id))),
            Script::NotFound => Ok(None),
            Script::Flaky(failures) if attempt <= failures => {
                Err(FetchError::Transient("connection reset".to_string()))
            }
            Script::Flaky(_) => Ok(Some(metadata(id))),
            Script::AlwaysTransient => Err(FetchError::Transient("status 503".to_string())),
            Script::Malformed => Err(FetchError::Malformed("expected value".to_string())),
        }
    }

    async fn prune(&self) {
        self.prunes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn metadata(id: i64) -> Metadata {
    Metadata {
        id,
        title: Title {
            english: Some(format!("\"Sauce number {id}\"")),
            japanese: None,
            pretty: Some(format!("Sauce {id}")),
        },
        uploaded_at: DateTime::from_timestamp(1_600_000_000 + id, 0).unwrap(),
        tags: vec![
            Tag::new("tag", if id % 2 == 0 { "full color" } else { "sole female" }),
            Tag::new("language", "english"),
        ],
        pages: 10 + id,
        favorites: id * 100,
    }
}

pub fn record(id: i64) -> SauceRecord {
    SauceRecord::from(&metadata(id))
}

pub async fn store_with(ids: &[i64]) -> SauceStore {
    let store = SauceStore::in_memory().await.unwrap();
    for id in ids {
        store.insert(&record(*id)).await.unwrap();
    }
    store.commit().await.unwrap();
    store
}

/// Options with a fast retry backoff
pub fn options(batch_size: usize) -> IndexOptions {
    IndexOptions {
        batch_size,
        cursor: CursorMode::MaxId,
        max_attempts: 3,
        backoff: Duration::from_millis(1),
        max_batches: None,
    }
}
