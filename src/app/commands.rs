use super::App;
use crate::{
    fetch::Fetch,
    indexer::{self, IndexOptions, IndexReport, StopReason},
    metrics::encode_metrics,
    render::{Table, shorten},
    shell::{Args, Flow},
    store::{Column, SauceRecord},
};
use anyhow::{Context, Result, bail, ensure};
use std::{io::ErrorKind, path::Path, sync::Arc};
use tracing::{info, warn};

const TITLE_WIDTH: usize = 60;
const UPLOADED_FORMAT: &str = "%A, %d %b %Y";

/// Table of records as shown by `sauce-list` and `sauce-get`
#[must_use]
pub fn sauce_table(records: &[SauceRecord]) -> Table {
    let mut table = Table::new(["ID", "Title", "Uploaded On", "Tags", "Pages", "Favorites"]);
    for record in records {
        let uploaded = record.uploaded_at().map_or_else(
            || record.uploaded.to_string(),
            |at| at.format(UPLOADED_FORMAT).to_string(),
        );
        table.row([
            record.id.to_string(),
            shorten(&record.title, TITLE_WIDTH),
            uploaded,
            record.tags_of("tag").collect::<Vec<_>>().join(", "),
            record.pages.to_string(),
            record.favorites.to_string(),
        ]);
    }
    table
}

/// One line summary of an indexing run
#[must_use]
pub fn report_summary(report: &IndexReport) -> String {
    let reason = match report.stopped {
        StopReason::Exhausted => "reached the end of the catalog",
        StopReason::Interrupted => "interrupted",
        StopReason::BatchLimit => "batch limit reached",
    };
    let mut summary = format!(
        "Indexed {} sauce(s) from #{} in {} batch(es), {reason}, next id #{}",
        report.inserted, report.start, report.batches, report.next
    );
    if report.duplicates > 0 {
        summary.push_str(&format!(", {} already stored", report.duplicates));
    }
    if !report.skipped.is_empty() {
        summary.push_str(&format!(", {} skipped", report.skipped.len()));
    }
    summary
}

async fn remove_generated(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!("removed {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

async fn index<F: Fetch>(app: &App<F>, max_batches: Option<usize>) -> Result<IndexReport> {
    let mut options = IndexOptions::from_config(app.config());
    options.max_batches = max_batches;

    println!("Updating database, press Ctrl-C to stop{}", app.log_hint());

    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    let report = indexer::run(app.store(), app.fetcher(), &options, interrupt)
        .await
        .with_context(|| format!("Indexing stopped on a store failure{}", app.log_hint()))?;

    println!("{}", report_summary(&report));
    Ok(report)
}

/// `q`, `exit`, `quit`
///
/// # Errors
///
/// Returns an error if the store cannot be closed
pub async fn quit<F: Fetch>(app: Arc<App<F>>, _args: Args) -> Result<Flow> {
    app.store()
        .close()
        .await
        .context("Failed to close the database")?;
    println!("Goodbye!");
    Ok(Flow::Quit)
}

/// `c`, `clean`
///
/// # Errors
///
/// Returns an error if the store cannot be closed or a file removed
pub async fn clean<F: Fetch>(app: Arc<App<F>>, _args: Args) -> Result<Flow> {
    app.store()
        .close()
        .await
        .context("Failed to close the database")?;

    if let Some(database) = app.store().path() {
        remove_generated(database).await?;
    }
    if let Some(log_file) = &app.config().log_file {
        remove_generated(log_file).await?;
    }

    println!("Removed generated files");
    println!("Goodbye!");
    Ok(Flow::Quit)
}

/// `u`, `sauce-update`, `index`
///
/// # Errors
///
/// Returns an error if the indexing run aborts
pub async fn update<F: Fetch>(app: Arc<App<F>>, _args: Args) -> Result<Flow> {
    index(&app, None).await?;
    Ok(Flow::Continue)
}

/// `index-batches <n>`
///
/// # Errors
///
/// Returns an error if `n` is not positive or the indexing run aborts
pub async fn index_batches<F: Fetch>(app: Arc<App<F>>, args: Args) -> Result<Flow> {
    let batches = args.integer(0)?;
    ensure!(batches > 0, "the number of batches must be positive, got {batches}");
    let batches = usize::try_from(batches).context("too many batches")?;

    index(&app, Some(batches)).await?;
    Ok(Flow::Continue)
}

/// `l`, `sauce-list`
///
/// # Errors
///
/// Returns an error if the store is empty or cannot be read
pub async fn list<F: Fetch>(app: Arc<App<F>>, _args: Args) -> Result<Flow> {
    let records = app.store().records().await?;
    if records.is_empty() {
        bail!("the database is empty, run `sauce-update` to index the catalog");
    }

    print!("{}", sauce_table(&records));
    Ok(Flow::Continue)
}

/// `g`, `sauce-get <column> <value>`
///
/// # Errors
///
/// Returns an error for an unknown column or a value the column cannot hold
pub async fn get<F: Fetch>(app: Arc<App<F>>, args: Args) -> Result<Flow> {
    let column: Column = args.text(0)?.parse()?;
    let needle = args.text(1)?;

    let records = app.store().find(column, needle).await?;
    if records.is_empty() {
        println!("No sauce with {column} matching {needle:?}");
    } else {
        print!("{}", sauce_table(&records));
    }

    Ok(Flow::Continue)
}

/// `s`, `status`
///
/// # Errors
///
/// Returns an error if the store cannot be read
pub async fn status<F: Fetch>(app: Arc<App<F>>, _args: Args) -> Result<Flow> {
    let count = app.store().count().await?;
    let next = app.store().next_cursor(app.config().cursor).await?;
    let database = app
        .store()
        .path()
        .map_or_else(|| ":memory:".to_string(), |path| path.display().to_string());

    let mut table = Table::new(["Database", "Sauces", "Next id"]);
    table.row([database, count.to_string(), next.to_string()]);
    print!("{table}");

    Ok(Flow::Continue)
}

/// `metrics`
///
/// # Errors
///
/// Returns an error if the metrics cannot be encoded
#[allow(clippy::unused_async)]
pub async fn metrics<F: Fetch>(_app: Arc<App<F>>, _args: Args) -> Result<Flow> {
    let buffer = encode_metrics()?;
    print!("{}", String::from_utf8_lossy(&buffer));
    Ok(Flow::Continue)
}
