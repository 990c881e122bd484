// src/ingest/backfill.rs
//! Day-by-day historical backfill.
//!
//! One bad day never aborts the run: each day is retried a bounded number of
//! times, then recorded as failed, and the loop moves on. Days already written
//! stay on disk if the process is interrupted.

use anyhow::Result;
use chrono::{DateTime, Days, NaiveDate, Utc};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::snapshot::SnapshotWriter;
use super::types::{ArticleRecord, DaySource};
use crate::config::BackfillConfig;
use crate::telemetry::ensure_metrics_described;

/// Run-level statistics, persisted as `backfill_summary.json` at the end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestionRun {
    pub total_articles: usize,
    pub days_processed: u32,
    pub days_failed: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub failed_dates: Vec<NaiveDate>,
}

impl IngestionRun {
    fn start() -> Self {
        Self {
            total_articles: 0,
            days_processed: 0,
            days_failed: 0,
            start_time: Utc::now(),
            end_time: None,
            failed_dates: Vec::new(),
        }
    }

    pub fn days_total(&self) -> u32 {
        self.days_processed + self.days_failed
    }

    pub fn is_clean(&self) -> bool {
        self.days_failed == 0
    }
}

/// Every calendar day from `start` through `end`, ascending. Empty if `start > end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

pub struct BackfillCoordinator<S: DaySource> {
    source: S,
    writer: SnapshotWriter,
    cfg: BackfillConfig,
}

impl<S: DaySource> BackfillCoordinator<S> {
    pub fn new(source: S, cfg: BackfillConfig) -> Result<Self> {
        ensure_metrics_described();
        let writer = SnapshotWriter::new(cfg.data_dir.clone())?;
        Ok(Self {
            source,
            writer,
            cfg,
        })
    }

    pub fn writer(&self) -> &SnapshotWriter {
        &self.writer
    }

    /// Backfill `[today - days, today]` (UTC), inclusive on both ends.
    pub async fn run(&self, days: u32) -> IngestionRun {
        let end = Utc::now().date_naive();
        let start = end
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        self.run_range(start, end).await
    }

    pub async fn run_range(&self, start: NaiveDate, end: NaiveDate) -> IngestionRun {
        let dates = date_range(start, end);
        let mut run = IngestionRun::start();

        info!(
            %start,
            %end,
            days = dates.len(),
            data_dir = %self.writer.dir().display(),
            "historical backfill started"
        );

        for (i, date) in dates.iter().copied().enumerate() {
            let t0 = std::time::Instant::now();

            match self.process_and_save(date).await {
                Ok(count) => {
                    run.total_articles += count;
                    run.days_processed += 1;
                    counter!("backfill_days_processed_total").increment(1);
                    counter!("backfill_articles_total").increment(count as u64);
                    info!(%date, articles = count, "day saved");
                }
                Err(e) => {
                    run.days_failed += 1;
                    run.failed_dates.push(date);
                    counter!("backfill_days_failed_total").increment(1);
                    error!(%date, error = ?e, "day failed");
                }
            }
            histogram!("backfill_day_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

            if i + 1 < dates.len() {
                debug!(delay_ms = self.cfg.rate_limit_delay_ms, "sleeping (rate limit)");
                tokio::time::sleep(self.cfg.rate_limit_delay()).await;
            }
        }

        run.end_time = Some(Utc::now());
        info!(
            days_processed = run.days_processed,
            days_failed = run.days_failed,
            total_articles = run.total_articles,
            "backfill complete"
        );

        if let Err(e) = self.writer.write_summary(&run) {
            error!(error = ?e, "failed to write backfill summary");
        }
        run
    }

    async fn process_and_save(&self, date: NaiveDate) -> Result<usize> {
        let articles = self.process_day(date).await?;
        self.writer.write_day(date, &articles)?;
        Ok(articles.len())
    }

    /// Up to `max_retries` attempts for one day, never crossing into the next.
    async fn process_day(&self, date: NaiveDate) -> Result<Vec<ArticleRecord>> {
        let attempts = self.cfg.max_retries.max(1);
        let mut attempt = 1;
        loop {
            match self.source.fetch_day(date, self.cfg.articles_per_day).await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < attempts => {
                    warn!(%date, attempt, error = ?e, "day fetch failed, retrying");
                    tokio::time::sleep(self.cfg.retry_delay()).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.context(format!("{attempts} attempts exhausted"))),
            }
        }
    }
}
