//! Application context shared by every shell command
//!
//! - `commands` - built-in command handlers

pub mod commands;

use crate::{
    config::Config,
    fetch::{Fetch, HttpFetcher},
    shell::{Command, Kind, Registry, RegistryError},
    store::SauceStore,
};
use anyhow::{Context, Result};
use tracing::{debug, error};

/// Store, fetcher and settings, built once and handed to every handler
pub struct App<F = HttpFetcher> {
    config: Config,
    store: SauceStore,
    fetcher: F,
}

impl App<HttpFetcher> {
    /// Open the configured database and build the HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the client built
    pub async fn open(config: Config) -> Result<Self> {
        let store = SauceStore::open(&config.database)
            .await
            .with_context(|| format!("Failed to open database {}", config.database.display()))?;
        let fetcher = HttpFetcher::new(&config.fetch)?;

        debug!(database = %config.database.display(), api = %config.fetch.base_url, "application ready");

        Ok(Self::with_parts(config, store, fetcher))
    }
}

impl<F: Fetch> App<F> {
    #[must_use]
    pub const fn with_parts(config: Config, store: SauceStore, fetcher: F) -> Self {
        Self {
            config,
            store,
            fetcher,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &SauceStore {
        &self.store
    }

    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Suffix pointing the operator to the runtime log, empty without one
    #[must_use]
    pub fn log_hint(&self) -> String {
        self.config
            .log_file
            .as_ref()
            .map_or_else(String::new, |path| {
                format!(", check {} for details", path.display())
            })
    }

    /// Commit and close the store, safe to call more than once
    pub async fn shutdown(&self) {
        if let Err(err) = self.store.close().await {
            error!("failed to close the store: {err}");
        }
    }
}

const QUIT_DOC: &str = "
    Commit pending writes, close the database and exit

    Prefer this over Ctrl-C, which only interrupts the running command.
";

const CLEAN_DOC: &str = "
    Remove the files created on start and exit

    Deletes the database and the runtime log. Useful when the database is
    locked or corrupted.
";

const UPDATE_DOC: &str = "
    Index the remote catalog

    Starts after the newest stored sauce and runs until the catalog ends or
    Ctrl-C is pressed. Sauces fetched by an interrupted batch are discarded.
";

const INDEX_BATCHES_DOC: &str = "
    Index at most <n> batches of the remote catalog
";

const LIST_DOC: &str = "
    List the sauces stored in the database
";

const GET_DOC: &str = "
    Find sauces by id, title, uploaded, tags, pages or favorites

    Examples:
        g id 177013
        sauce-get title metamorphosis
        sauce-get tags \"full color\"
        sauce-get tags artist:shindol
";

const STATUS_DOC: &str = "
    Show the number of stored sauces and the next id to index
";

const METRICS_DOC: &str = "
    Print the prometheus metrics of this session
";

/// Registry with every built-in command
///
/// # Errors
///
/// Returns an error if two commands share an alias
pub fn registry<F: Fetch + 'static>() -> Result<Registry<App<F>>, RegistryError> {
    let mut registry = Registry::new();

    registry.register(Command::new(["q", "exit", "quit"], commands::quit::<F>).doc(QUIT_DOC))?;
    registry.register(Command::new(["c", "clean"], commands::clean::<F>).doc(CLEAN_DOC))?;
    registry.register(
        Command::new(["u", "sauce-update", "index"], commands::update::<F>).doc(UPDATE_DOC),
    )?;
    registry.register(Command::new(["l", "sauce-list"], commands::list::<F>).doc(LIST_DOC))?;
    registry.register(
        Command::new(["g", "sauce-get"], commands::get::<F>)
            .params([Kind::Text, Kind::Text])
            .doc(GET_DOC),
    )?;
    registry.register(Command::new(["s", "status"], commands::status::<F>).doc(STATUS_DOC))?;
    registry.register(
        Command::new(["metrics"], commands::metrics::<F>)
            .doc(METRICS_DOC)
            .hidden(),
    )?;
    registry.register(
        Command::new(["index-batches"], commands::index_batches::<F>)
            .params([Kind::Integer])
            .doc(INDEX_BATCHES_DOC)
            .hidden(),
    )?;

    Ok(registry)
}
