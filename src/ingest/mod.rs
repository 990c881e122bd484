// src/ingest/mod.rs
//! Historical news ingestion: upstream providers, per-day fetch with synthetic
//! fallback, snapshot persistence and the backfill run loop.

pub mod backfill;
pub mod fetcher;
pub mod providers;
pub mod snapshot;
pub mod types;

pub use backfill::{date_range, BackfillCoordinator, IngestionRun};
pub use fetcher::HistoricalFetcher;
pub use snapshot::{DaySnapshot, SnapshotWriter, SUMMARY_FILE};
pub use types::{ArticleRecord, DaySource, NewsProvider};
