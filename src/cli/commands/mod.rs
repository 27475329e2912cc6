use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Pure clap command definitions with zero business logic
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("database")
                .default_value("sauces.db")
                .env("SAUCEDB_DATABASE")
                .help("SQLite database file, created if missing")
                .long("database")
                .short('d')
                .value_name("PATH"),
        )
        .arg(
            Arg::new("log-file")
                .default_value("saucedb.log")
                .env("SAUCEDB_LOG_FILE")
                .help("Runtime log file, receives debug level events, empty to disable")
                .long("log-file")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("batch-size")
                .default_value("100")
                .env("SAUCEDB_BATCH_SIZE")
                .help("Ids fetched concurrently and committed together")
                .long("batch-size")
                .short('b')
                .value_parser(clap::value_parser!(u32).range(1..=10_000)),
        )
        .arg(
            Arg::new("cursor")
                .default_value("max-id")
                .env("SAUCEDB_CURSOR")
                .help("How the next id to index is derived: max-id, row-count")
                .long("cursor")
                .long_help(
                    "How the next id to index is derived from the stored rows:\n\n\
                    - max-id: largest stored id plus one (default)\n\
                    - row-count: number of stored rows plus one, only correct \
                    when no id was ever skipped",
                )
                .value_name("MODE")
                .value_parser(["max-id", "row-count"]),
        )
        .arg(
            Arg::new("api-url")
                .default_value(crate::config::DEFAULT_API_URL)
                .env("SAUCEDB_API_URL")
                .help("Base URL of the gallery API")
                .long("api-url")
                .value_name("URL"),
        )
        .arg(
            Arg::new("timeout")
                .default_value("30")
                .env("SAUCEDB_TIMEOUT")
                .help("Request timeout in seconds")
                .long("timeout")
                .short('t')
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("cache-limit")
                .default_value("1000")
                .env("SAUCEDB_CACHE_LIMIT")
                .help("Fetched items kept in memory, 0 disables the cache")
                .long("cache-limit")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("retries")
                .default_value("3")
                .env("SAUCEDB_RETRIES")
                .help("Attempts per id before a transient failure is skipped")
                .long("retries")
                .short('r')
                .value_parser(clap::value_parser!(u32).range(1..=20)),
        )
        .arg(
            Arg::new("metrics-port")
                .env("SAUCEDB_METRICS_PORT")
                .help("Serve /metrics on this port")
                .long("metrics-port")
                .short('p')
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("listen")
                .env("SAUCEDB_LISTEN")
                .help("IP address for /metrics (default: [::], falls back to 0.0.0.0)")
                .long("listen")
                .short('l')
                .value_name("IP")
                .requires("metrics-port"),
        )
        .arg(
            Arg::new("execute")
                .help("Run these command lines instead of the interactive prompt")
                .long("execute")
                .short('e')
                .action(ArgAction::Append)
                .value_name("LINE"),
        )
        .arg(
            Arg::new("verbose")
                .help("Increase console verbosity, -vv for trace")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .help("Only log errors to the console")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
}
