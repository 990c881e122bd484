// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod cache;
pub mod config;
pub mod ingest;
pub mod notify;
pub mod sentiment;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::cache::{cache_key, CacheLookup, ResultCache};
pub use crate::config::AppConfig;
pub use crate::ingest::{BackfillCoordinator, HistoricalFetcher, IngestionRun};
pub use crate::notify::{AlertDispatcher, AlertMetrics};
pub use crate::sentiment::{analyze_cached, SentimentScore, SentimentScorer};
