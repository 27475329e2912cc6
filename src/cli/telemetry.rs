use anyhow::{Context, Result};
use std::{fs::OpenOptions, path::Path, sync::Mutex};
use tracing_subscriber::{
    Layer,
    filter::{LevelFilter, Targets},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Events of this crate written to the runtime log
const LOG_FILE_LEVEL: LevelFilter = LevelFilter::DEBUG;

/// Filter for the runtime log, dependencies only contribute warnings
fn file_filter() -> Targets {
    Targets::new()
        .with_target(env!("CARGO_CRATE_NAME"), LOG_FILE_LEVEL)
        .with_default(LevelFilter::WARN)
}

/// Install the global subscriber
///
/// Console events go to stderr at `verbosity`. With a log file, this crate's
/// events down to debug are appended to it without colors.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed
pub fn init(verbosity: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(verbosity);

    let file = log_file
        .map(|path| -> Result<_> {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            Ok(fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(file_filter()))
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
