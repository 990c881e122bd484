// tests/backfill_resilience.rs
//! Backfill run loop: a failing day is recorded and skipped, the rest land on disk.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use crypto_news_sentinel::config::BackfillConfig;
use crypto_news_sentinel::ingest::providers::synthetic::synthetic_articles;
use crypto_news_sentinel::ingest::{
    ArticleRecord, BackfillCoordinator, DaySource, HistoricalFetcher, SUMMARY_FILE,
};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

/// Serves synthetic batches, except for `bad_day` which always errors.
struct Scripted {
    bad_day: NaiveDate,
    calls: AtomicU32,
}

#[async_trait]
impl DaySource for Scripted {
    async fn fetch_day(&self, date: NaiveDate, limit: usize) -> Result<Vec<ArticleRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if date == self.bad_day {
            return Err(anyhow!("upstream unavailable for {date}"));
        }
        Ok(synthetic_articles(date, limit.min(4)))
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn quick_cfg(dir: &Path) -> BackfillConfig {
    BackfillConfig {
        max_retries: 3,
        retry_delay_ms: 0,
        rate_limit_delay_ms: 0,
        data_dir: dir.to_path_buf(),
        ..BackfillConfig::default()
    }
}

fn snapshot_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("news_") && n.ends_with(".json"))
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn failing_day_is_recorded_and_run_continues() {
    let tmp = tempfile::tempdir().unwrap();
    let source = Scripted {
        bad_day: d(2025, 3, 2),
        calls: AtomicU32::new(0),
    };
    let coord = BackfillCoordinator::new(source, quick_cfg(tmp.path())).unwrap();

    let run = coord.run_range(d(2025, 3, 1), d(2025, 3, 3)).await;

    assert_eq!(run.days_processed, 2);
    assert_eq!(run.days_failed, 1);
    assert_eq!(run.days_total(), 3);
    assert_eq!(run.total_articles, 8);
    assert_eq!(run.failed_dates, vec![d(2025, 3, 2)]);
    assert!(!run.is_clean());
    assert!(run.end_time.is_some_and(|t| t >= run.start_time));

    assert_eq!(
        snapshot_files(tmp.path()),
        vec!["news_2025-03-01.json", "news_2025-03-03.json"]
    );
    assert!(tmp.path().join(SUMMARY_FILE).exists());
}

#[tokio::test]
async fn failing_day_uses_every_attempt_then_moves_on() {
    let tmp = tempfile::tempdir().unwrap();
    let coord = BackfillCoordinator::new(
        Scripted {
            bad_day: d(2025, 3, 1),
            calls: AtomicU32::new(0),
        },
        quick_cfg(tmp.path()),
    )
    .unwrap();

    let run = coord.run_range(d(2025, 3, 1), d(2025, 3, 1)).await;
    assert_eq!(run.days_failed, 1);
    assert!(snapshot_files(tmp.path()).is_empty());

    // Summary still written with zero successes.
    let raw = std::fs::read_to_string(tmp.path().join(SUMMARY_FILE)).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["days_processed"], 0);
    assert_eq!(v["days_failed"], 1);
    assert_eq!(v["total_articles"], 0);
}

#[tokio::test]
async fn attempts_per_day_are_bounded() {
    let tmp = tempfile::tempdir().unwrap();
    let source = std::sync::Arc::new(Scripted {
        bad_day: d(2025, 3, 1),
        calls: AtomicU32::new(0),
    });

    struct Shared(std::sync::Arc<Scripted>);

    #[async_trait]
    impl DaySource for Shared {
        async fn fetch_day(&self, date: NaiveDate, limit: usize) -> Result<Vec<ArticleRecord>> {
            self.0.fetch_day(date, limit).await
        }
    }

    let coord = BackfillCoordinator::new(Shared(source.clone()), quick_cfg(tmp.path())).unwrap();
    let run = coord.run_range(d(2025, 3, 1), d(2025, 3, 2)).await;
    // 3 attempts on the bad day, 1 on the good one.
    assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    assert_eq!(run.days_processed, 1);
    assert_eq!(coord.writer().read_day(d(2025, 3, 2)).unwrap().article_count, 4);
    assert!(coord.writer().read_day(d(2025, 3, 1)).is_err());
}

#[tokio::test]
async fn run_without_providers_writes_mock_snapshots() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = BackfillConfig {
        mock_count: 5,
        ..quick_cfg(tmp.path())
    };
    let coord = BackfillCoordinator::new(HistoricalFetcher::new(vec![], cfg.mock_count), cfg)
        .unwrap();

    let run = coord.run(2).await;
    assert_eq!(run.days_processed, 3);
    assert!(run.is_clean());
    assert_eq!(run.total_articles, 15);

    let files = snapshot_files(tmp.path());
    assert_eq!(files.len(), 3);

    let today = Utc::now().date_naive();
    let snap = coord.writer().read_day(today).unwrap();
    assert_eq!(snap.date, today);
    assert_eq!(snap.article_count, 5);
    assert!(snap.articles.iter().all(ArticleRecord::is_synthetic));
    assert!(snap.articles.iter().all(|a| a.published_on(today)));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_pause_only_between_days() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = BackfillConfig {
        rate_limit_delay_ms: 2_000,
        ..quick_cfg(tmp.path())
    };
    let coord = BackfillCoordinator::new(HistoricalFetcher::new(vec![], 1), cfg).unwrap();

    let t0 = tokio::time::Instant::now();
    coord.run_range(d(2025, 1, 1), d(2025, 1, 3)).await;
    // Two gaps for three days; none after the last.
    let elapsed = t0.elapsed();
    assert!(elapsed >= std::time::Duration::from_millis(4_000));
    assert!(elapsed < std::time::Duration::from_millis(6_000));
}

#[tokio::test(start_paused = true)]
async fn retry_delay_only_between_failed_attempts() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = BackfillConfig {
        retry_delay_ms: 5_000,
        rate_limit_delay_ms: 0,
        ..quick_cfg(tmp.path())
    };

    // Good day alone: one attempt, no retry wait.
    let good = BackfillCoordinator::new(
        Scripted {
            bad_day: d(2025, 3, 9),
            calls: AtomicU32::new(0),
        },
        cfg.clone(),
    )
    .unwrap();
    let t0 = tokio::time::Instant::now();
    let run = good.run_range(d(2025, 3, 1), d(2025, 3, 1)).await;
    assert!(run.is_clean());
    assert!(t0.elapsed() < std::time::Duration::from_millis(1_000));

    // Bad day then good day: 3 attempts with 2 waits, nothing after the last attempt.
    let coord = BackfillCoordinator::new(
        Scripted {
            bad_day: d(2025, 3, 1),
            calls: AtomicU32::new(0),
        },
        cfg,
    )
    .unwrap();
    let t0 = tokio::time::Instant::now();
    let run = coord.run_range(d(2025, 3, 1), d(2025, 3, 2)).await;
    let elapsed = t0.elapsed();
    assert_eq!((run.days_processed, run.days_failed), (1, 1));
    assert!(elapsed >= std::time::Duration::from_millis(10_000), "{elapsed:?}");
    assert!(elapsed < std::time::Duration::from_millis(15_000), "{elapsed:?}");
}
