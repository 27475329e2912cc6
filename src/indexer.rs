use crate::{
    config::{Config, CursorMode},
    fetch::{Fetch, FetchError, Metadata},
    metrics::{
        BATCH_DURATION, COMMITS, CURSOR, DUPLICATES, FETCH_OUTCOMES, FETCH_RETRIES, SAUCES_INDEXED,
    },
    store::{SauceRecord, SauceStore, StoreError},
};
use anyhow::{Context, Result};
use futures::future::join_all;
use rand::Rng;
use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Ids fetched concurrently and committed together
    pub batch_size: usize,
    pub cursor: CursorMode,
    pub max_attempts: u32,
    pub backoff: Duration,
    /// Stop after this many committed batches
    pub max_batches: Option<usize>,
}

impl IndexOptions {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            cursor: config.cursor,
            max_attempts: config.fetch.max_attempts,
            backoff: config.fetch.backoff,
            max_batches: None,
        }
    }
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The remote catalog returned not-found
    Exhausted,
    Interrupted,
    BatchLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub start: i64,
    /// Cursor to resume from
    pub next: i64,
    pub batches: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: Vec<i64>,
    pub stopped: StopReason,
}

#[derive(Debug)]
enum Outcome {
    Found(Metadata),
    NotFound,
    Skipped(FetchError),
}

/// Exponential backoff with up to 50% jitter
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let exponential = base.saturating_mul(1 << attempt.saturating_sub(1).min(10));
    let jitter = base.mul_f64(rand::rng().random::<f64>() * 0.5);
    exponential.saturating_add(jitter).min(MAX_BACKOFF)
}

async fn fetch_with_retry<F: Fetch>(
    fetcher: &F,
    id: i64,
    max_attempts: u32,
    backoff: Duration,
) -> Outcome {
    let mut attempt = 1;
    loop {
        match fetcher.fetch(id).await {
            Ok(Some(metadata)) => {
                FETCH_OUTCOMES.with_label_values(&["found"]).inc();
                return Outcome::Found(metadata);
            }
            Ok(None) => {
                FETCH_OUTCOMES.with_label_values(&["not_found"]).inc();
                return Outcome::NotFound;
            }
            Err(err) => {
                FETCH_OUTCOMES.with_label_values(&[err.label()]).inc();
                if !err.is_transient() || attempt >= max_attempts {
                    return Outcome::Skipped(err);
                }

                let delay = retry_delay(backoff, attempt);
                debug!(id, attempt, ?delay, "retrying after: {err}");
                FETCH_RETRIES.inc();
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Index the remote catalog from the store's next cursor
///
/// Each round fetches `batch_size` consecutive ids concurrently, waits for all
/// of them, inserts what was found and commits once. `interrupt` is only
/// watched while fetches are in flight; when it fires the round is discarded
/// and nothing of it is inserted. A not-found id ends the run, items below it
/// in the same round are still committed.
///
/// # Errors
///
/// Returns an error if a store operation other than a duplicate insert fails,
/// the failing round is rolled back first
pub async fn run<F, I>(
    store: &SauceStore,
    fetcher: &F,
    options: &IndexOptions,
    interrupt: I,
) -> Result<IndexReport>
where
    F: Fetch,
    I: Future<Output = ()>,
{
    let batch_size = options.batch_size.max(1);
    let step = i64::try_from(batch_size).context("batch size is too large")?;
    let start = store
        .next_cursor(options.cursor)
        .await
        .context("Failed to compute the next cursor")?;

    let mut cursor = start;
    let mut batches = 0;
    let mut inserted = 0;
    let mut duplicates = 0;
    let mut skipped = Vec::new();

    tokio::pin!(interrupt);

    info!(start, batch_size, "indexing");

    let stopped = loop {
        if options.max_batches.is_some_and(|max| batches >= max) {
            break StopReason::BatchLimit;
        }

        fetcher.prune().await;

        CURSOR.set(cursor);
        let timer = BATCH_DURATION.start_timer();
        let ids: Vec<i64> = (cursor..cursor + step).collect();

        let fetches = join_all(
            ids.iter()
                .map(|id| fetch_with_retry(fetcher, *id, options.max_attempts, options.backoff)),
        );

        let outcomes = tokio::select! {
            biased;
            () = &mut interrupt => {
                timer.stop_and_discard();
                info!(cursor, "interrupted, in-flight batch discarded");
                break StopReason::Interrupted;
            }
            outcomes = fetches => outcomes,
        };

        let mut boundary = None;
        for (id, outcome) in ids.iter().copied().zip(outcomes) {
            match outcome {
                Outcome::NotFound => {
                    boundary = Some(id);
                    break;
                }
                Outcome::Skipped(err) => {
                    warn!(id, "skipping: {err}");
                    FETCH_OUTCOMES.with_label_values(&["skipped"]).inc();
                    skipped.push(id);
                }
                Outcome::Found(metadata) => {
                    let record = SauceRecord::from(&metadata);
                    match store.insert(&record).await {
                        Ok(()) => {
                            debug!(id = record.id, title = %record.title, "added");
                            SAUCES_INDEXED.inc();
                            inserted += 1;
                        }
                        Err(StoreError::AlreadyExists { id }) => {
                            warn!("sauce #{id} already exists");
                            DUPLICATES.inc();
                            duplicates += 1;
                        }
                        Err(err) => {
                            if let Err(rollback) = store.rollback().await {
                                error!("rollback failed: {rollback}");
                            }
                            return Err(anyhow::Error::new(err).context(format!(
                                "batch starting at #{cursor} aborted, nothing of it was committed"
                            )));
                        }
                    }
                }
            }
        }

        if let Err(err) = store.commit().await {
            if let Err(rollback) = store.rollback().await {
                error!("rollback failed: {rollback}");
            }
            return Err(anyhow::Error::new(err)
                .context(format!("Failed to commit batch starting at #{cursor}")));
        }
        COMMITS.inc();
        timer.observe_duration();
        batches += 1;

        info!(from = cursor, inserted, duplicates, "batch committed");

        if let Some(id) = boundary {
            info!(id, "end of catalog");
            cursor = id;
            break StopReason::Exhausted;
        }

        cursor += step;
    };

    CURSOR.set(cursor);

    Ok(IndexReport {
        start,
        next: cursor,
        batches,
        inserted,
        duplicates,
        skipped,
        stopped,
    })
}
