pub use crate::store::CursorMode;

use std::{net::IpAddr, path::PathBuf, time::Duration};

pub const DEFAULT_API_URL: &str = "https://nhentai.net";

/// Remote service settings
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub cache_limit: usize,
    pub cache_ttl: Duration,
    /// Attempts per id before a transient failure becomes a skip
    pub max_attempts: u32,
    /// Base delay of the exponential retry backoff
    pub backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            cache_limit: 1000,
            cache_ttl: Duration::from_secs(3600),
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Everything the application context is built from
#[derive(Debug, Clone)]
pub struct Config {
    pub database: PathBuf,
    pub log_file: Option<PathBuf>,
    pub batch_size: usize,
    pub cursor: CursorMode,
    pub fetch: FetchConfig,
    pub listen: Option<IpAddr>,
    /// `/metrics` is only served when a port is set
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("sauces.db"),
            log_file: Some(PathBuf::from("saucedb.log")),
            batch_size: 100,
            cursor: CursorMode::default(),
            fetch: FetchConfig::default(),
            listen: None,
            metrics_port: None,
        }
    }
}
