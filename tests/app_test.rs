#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{ScriptedFetcher, store_with};
use saucedb::{
    app::{self, App},
    config::Config,
    shell::{DispatchError, Flow, Shell},
    store::{CursorMode, SauceStore},
};
use std::{sync::Arc, time::Duration};

fn config() -> Config {
    let mut config = Config {
        batch_size: 5,
        ..Config::default()
    };
    config.fetch.backoff = Duration::from_millis(1);
    config
}

fn shell(store: SauceStore, fetcher: ScriptedFetcher) -> Shell<App<ScriptedFetcher>> {
    let app = Arc::new(App::with_parts(config(), store, fetcher));
    Shell::new(app::registry().unwrap(), app)
}

#[tokio::test]
async fn test_update_indexes_until_exhausted() {
    let shell = shell(
        SauceStore::in_memory().await.unwrap(),
        ScriptedFetcher::catalog(12),
    );

    assert_eq!(shell.dispatch("sauce-update").await.unwrap(), Flow::Continue);

    let store = shell.context().store();
    assert_eq!(store.count().await.unwrap(), 12);
    assert_eq!(store.next_cursor(CursorMode::MaxId).await.unwrap(), 13);

    // nothing new upstream, a second run only asks for the next batch
    assert_eq!(shell.dispatch("u").await.unwrap(), Flow::Continue);
    assert_eq!(store.count().await.unwrap(), 12);
}

#[tokio::test]
async fn test_index_batches_limits_rounds() {
    let shell = shell(
        SauceStore::in_memory().await.unwrap(),
        ScriptedFetcher::catalog(100),
    );

    shell.dispatch("index-batches 2").await.unwrap();
    assert_eq!(shell.context().store().count().await.unwrap(), 10);

    let err = shell.dispatch("index-batches 0").await.unwrap_err();
    assert!(matches!(err, DispatchError::CommandFailed { .. }));
    assert!(matches!(
        shell.dispatch("index-batches two").await,
        Err(DispatchError::Coercion(_))
    ));
}

#[tokio::test]
async fn test_list_on_empty_store_fails_with_hint() {
    let shell = shell(
        SauceStore::in_memory().await.unwrap(),
        ScriptedFetcher::catalog(0),
    );

    let err = shell.dispatch("l").await.unwrap_err();
    assert!(matches!(err, DispatchError::CommandFailed { .. }));
    assert!(err.to_string().contains("sauce-update"));
}

#[tokio::test]
async fn test_list_and_get_on_indexed_store() {
    let shell = shell(store_with(&[1, 2, 3]).await, ScriptedFetcher::catalog(0));

    assert_eq!(shell.dispatch("sauce-list").await.unwrap(), Flow::Continue);
    assert_eq!(shell.dispatch("g id 2").await.unwrap(), Flow::Continue);
    assert_eq!(
        shell.dispatch(r#"g tags "full color""#).await.unwrap(),
        Flow::Continue
    );
    assert_eq!(shell.dispatch("g title nothing").await.unwrap(), Flow::Continue);
}

#[tokio::test]
async fn test_get_rejects_unknown_column_and_bad_value() {
    let shell = shell(store_with(&[1]).await, ScriptedFetcher::catalog(0));

    let err = shell.dispatch("g colour red").await.unwrap_err();
    assert!(err.to_string().contains("unknown column"));

    let err = shell.dispatch("g pages many").await.unwrap_err();
    assert!(matches!(err, DispatchError::CommandFailed { .. }));

    assert!(matches!(
        shell.dispatch("g id").await,
        Err(DispatchError::ArityMismatch {
            expected: 2,
            got: 1,
            ..
        })
    ));
}

#[tokio::test]
async fn test_status_and_metrics() {
    let shell = shell(store_with(&[4, 5]).await, ScriptedFetcher::catalog(0));
    assert_eq!(shell.dispatch("status").await.unwrap(), Flow::Continue);
    assert_eq!(shell.dispatch("metrics").await.unwrap(), Flow::Continue);
}

#[tokio::test]
async fn test_quit_closes_the_store() {
    let shell = shell(store_with(&[1]).await, ScriptedFetcher::catalog(0));

    assert_eq!(shell.handle_line("status; quit; status").await, Flow::Quit);
    assert!(shell.context().store().is_closed().await);

    // shutdown after quit is harmless
    shell.context().shutdown().await;
}

#[tokio::test]
async fn test_clean_removes_generated_files() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("sauces.db");
    let log_file = dir.path().join("runtime.log");
    std::fs::write(&log_file, "started\n").unwrap();

    let store = SauceStore::open(&database).await.unwrap();
    let config = Config {
        database: database.clone(),
        log_file: Some(log_file.clone()),
        ..config()
    };
    let app = Arc::new(App::with_parts(config, store, ScriptedFetcher::catalog(3)));
    let shell = Shell::new(app::registry().unwrap(), Arc::clone(&app));

    shell.dispatch("u").await.unwrap();
    assert!(database.exists());

    assert_eq!(shell.dispatch("clean").await.unwrap(), Flow::Quit);
    assert!(!database.exists());
    assert!(!log_file.exists());
    assert!(app.store().is_closed().await);
}
