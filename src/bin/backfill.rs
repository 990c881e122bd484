//! Historical backfill job: fetch the past N days of crypto news into per-day
//! JSON snapshots plus a run summary.
//!
//! Exit status: 0 when every day succeeded, 1 when any day failed or the
//! arguments were invalid, 130 when interrupted.

use anyhow::Result;
use clap::Parser;
use crypto_news_sentinel::config::AppConfig;
use crypto_news_sentinel::ingest::{BackfillCoordinator, HistoricalFetcher};
use crypto_news_sentinel::telemetry;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Backfill historical crypto news
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of days to backfill (default: BACKFILL_DAYS or 30)
    #[arg(long)]
    days: Option<u32>,

    /// Enable verbose/debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Output directory for snapshots (default: BACKFILL_DATA_DIR or data/backfill)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Optional TOML config file; environment is used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(p) => match AppConfig::load_from_file(p) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("failed to load config: {e:#}");
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::from_env(),
    };
    if let Some(d) = args.days {
        cfg.backfill.days = d;
    }
    if let Some(dir) = args.data_dir {
        cfg.backfill.data_dir = dir;
    }
    cfg.backfill.verbose |= args.verbose;

    telemetry::init_tracing(cfg.backfill.verbose);
    telemetry::init_prometheus_from_env();

    if cfg.backfill.days == 0 {
        error!("days must be a positive integer");
        return ExitCode::FAILURE;
    }
    if cfg.backfill.days > 365 {
        warn!(days = cfg.backfill.days, "backfilling more than 365 days may take a very long time");
    }

    let days = cfg.backfill.days;
    let coordinator = match build(cfg) {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "backfill setup failed");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        run = coordinator.run(days) => {
            info!(
                days_processed = run.days_processed,
                days_failed = run.days_failed,
                total_articles = run.total_articles,
                data_dir = %coordinator.writer().dir().display(),
                "backfill finished"
            );
            if run.is_clean() {
                ExitCode::SUCCESS
            } else {
                warn!(failed = ?run.failed_dates, "some days failed to process");
                ExitCode::FAILURE
            }
        }
        _ = tokio::signal::ctrl_c() => {
            // Snapshots already written stay valid; no summary for a partial run.
            warn!("backfill interrupted by user");
            ExitCode::from(130)
        }
    }
}

fn build(cfg: AppConfig) -> Result<BackfillCoordinator<HistoricalFetcher>> {
    let fetcher = HistoricalFetcher::from_config(&cfg.providers, cfg.backfill.mock_count)?;
    info!(providers = ?fetcher.provider_names(), "providers configured");
    BackfillCoordinator::new(fetcher, cfg.backfill)
}
