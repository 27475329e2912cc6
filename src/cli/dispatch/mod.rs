use crate::{
    cli::actions::Action,
    config::{Config, CursorMode, FetchConfig},
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use std::{net::IpAddr, path::PathBuf, time::Duration};
use tracing::level_filters::LevelFilter;

/// Console log level from `-v` and `-q`, `info` by default
#[must_use]
pub fn extract_verbosity(matches: &ArgMatches) -> LevelFilter {
    if matches.get_flag("quiet") {
        return LevelFilter::ERROR;
    }

    match matches.get_count("verbose") {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error if an argument cannot be converted
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    let defaults = Config::default();

    let database = matches
        .get_one::<String>("database")
        .map_or(defaults.database, PathBuf::from);

    let log_file = matches
        .get_one::<String>("log-file")
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);

    let batch_size = matches
        .get_one::<u32>("batch-size")
        .map(|size| usize::try_from(*size))
        .transpose()
        .context("Invalid batch size")?
        .unwrap_or(defaults.batch_size);

    let cursor = matches
        .get_one::<String>("cursor")
        .map(|mode| mode.parse::<CursorMode>().map_err(|err| anyhow!(err)))
        .transpose()?
        .unwrap_or_default();

    let listen = matches
        .get_one::<String>("listen")
        .map(|addr| {
            addr.parse::<IpAddr>()
                .with_context(|| format!("Invalid IP address: {addr}"))
        })
        .transpose()?;

    let metrics_port = matches.get_one::<u16>("metrics-port").copied();

    let fetch = FetchConfig {
        base_url: matches
            .get_one::<String>("api-url")
            .cloned()
            .unwrap_or(defaults.fetch.base_url),
        timeout: matches
            .get_one::<u64>("timeout")
            .map_or(defaults.fetch.timeout, |secs| Duration::from_secs(*secs)),
        cache_limit: matches
            .get_one::<u32>("cache-limit")
            .map(|limit| usize::try_from(*limit))
            .transpose()
            .context("Invalid cache limit")?
            .unwrap_or(defaults.fetch.cache_limit),
        max_attempts: matches
            .get_one::<u32>("retries")
            .copied()
            .unwrap_or(defaults.fetch.max_attempts),
        ..defaults.fetch
    };

    let execute = matches
        .get_many::<String>("execute")
        .map(|lines| lines.cloned().collect())
        .unwrap_or_default();

    Ok(Action::Shell {
        config: Config {
            database,
            log_file,
            batch_size,
            cursor,
            fetch,
            listen,
            metrics_port,
        },
        execute,
    })
}
