// src/telemetry.rs
//! Logging and metrics bootstrap shared by the binaries.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact tracing logs (JSON lines when `LOG_FORMAT=json`). `RUST_LOG` wins;
/// otherwise `info`, or `debug` when verbose.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    // try_init: tests and demos may call this more than once.
    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json().with_target(false)).try_init()
    } else {
        registry.with(fmt::layer().compact().with_target(false)).try_init()
    };
}

/// Expose `/metrics` on `addr` when `METRICS_ADDR` is set. Best-effort.
pub fn init_prometheus_from_env() {
    let Ok(raw) = std::env::var("METRICS_ADDR") else {
        return;
    };
    let addr: SocketAddr = match raw.parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::warn!(error = %e, addr = %raw, "invalid METRICS_ADDR, metrics disabled");
            return;
        }
    };
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(%addr, "prometheus exporter listening"),
        Err(e) => tracing::warn!(error = ?e, "prometheus: install failed"),
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("cache_hits_total", "Result cache lookups that found an entry.");
        describe_counter!("cache_misses_total", "Result cache lookups with no entry.");
        describe_counter!(
            "cache_errors_total",
            "Result cache operations that failed against the store."
        );
        describe_counter!(
            "alerts_triggered_total",
            "Scores that crossed the alert threshold."
        );
        describe_counter!("alert_attempts_total", "Delivery attempts to the chat endpoint.");
        describe_counter!("alerts_sent_total", "Alerts delivered successfully.");
        describe_counter!("alerts_failed_total", "Alerts given up on.");
        describe_counter!(
            "backfill_days_processed_total",
            "Backfill days fetched and persisted."
        );
        describe_counter!("backfill_days_failed_total", "Backfill days that exhausted retries.");
        describe_counter!(
            "backfill_provider_errors_total",
            "Upstream provider fetch/parse errors."
        );
        describe_counter!("backfill_articles_total", "Articles persisted by backfill.");
        describe_histogram!("backfill_day_ms", "Wall time per backfill day in milliseconds.");
    });
}
