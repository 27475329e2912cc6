use anyhow::Result;
use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Registry, opts,
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry,
};
use std::{net::IpAddr, sync::LazyLock};
use tokio::net::TcpListener;
use tracing::{error, info};

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

trait ResultExt<T> {
    fn or_exit(self, context: &str) -> T;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn or_exit(self, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                eprintln!("failed to initialize metric ({context}): {err}");
                std::process::exit(1);
            }
        }
    }
}

pub static SAUCES_INDEXED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter_with_registry!(
        opts!("saucedb_sauces_indexed_total", "Sauces inserted into the store"),
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static DUPLICATES: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter_with_registry!(
        opts!(
            "saucedb_duplicates_total",
            "Fetched sauces that were already stored"
        ),
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static FETCH_OUTCOMES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec_with_registry!(
        opts!(
            "saucedb_fetch_outcomes_total",
            "Fetch results by outcome (found, not_found, transient, malformed, rejected, skipped)"
        ),
        &["outcome"],
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static FETCH_RETRIES: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter_with_registry!(
        opts!("saucedb_fetch_retries_total", "Retried fetch attempts"),
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static FETCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram_with_registry!(
        HistogramOpts::new(
            "saucedb_fetch_duration_seconds",
            "Duration of a single metadata request"
        ),
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static BATCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram_with_registry!(
        HistogramOpts::new(
            "saucedb_batch_duration_seconds",
            "Duration of one fetch, insert and commit round"
        ),
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static COMMITS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter_with_registry!(
        opts!("saucedb_commits_total", "Batch commits"),
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static CURSOR: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge_with_registry!(
        opts!("saucedb_cursor", "Next catalog id the indexer will attempt"),
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static PANICS_RECOVERED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter_with_registry!(
        opts!(
            "saucedb_panics_recovered_total",
            "Panics caught before the store was closed"
        ),
        &REGISTRY
    )
    .or_exit("metric can be created")
});

/// Encode all metrics in the prometheus text format
///
/// # Errors
///
/// Returns an error if encoding fails
pub fn encode_metrics() -> Result<Vec<u8>> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(buffer)
}

async fn metrics_handler() -> impl IntoResponse {
    match encode_metrics() {
        Ok(buffer) => (StatusCode::OK, buffer),
        Err(e) => {
            error!("{e}");
            (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
        }
    }
}

/// Bind the `/metrics` listener
///
/// Without an explicit address, IPv6 is tried first with an IPv4 fallback.
///
/// # Errors
///
/// Returns an error if the port cannot be bound
pub async fn bind(listen: Option<IpAddr>, port: u16) -> Result<(TcpListener, String)> {
    Ok(match listen {
        Some(addr) => {
            let socket_addr = format!("{addr}:{port}");
            let listener = TcpListener::bind(&socket_addr).await?;
            (listener, socket_addr)
        }
        None => {
            if let Ok(l) = TcpListener::bind(format!("::0:{port}")).await {
                (l, format!("[::]:{port}"))
            } else {
                let socket_addr = format!("0.0.0.0:{port}");
                (TcpListener::bind(&socket_addr).await?, socket_addr)
            }
        }
    })
}

/// Serve `/metrics` until the task is dropped
///
/// # Errors
///
/// Returns an error if the server fails
pub async fn serve(listener: TcpListener, bind_addr: String) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));
    info!("metrics listening on {bind_addr}");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
