// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

/// Normalized article shape shared by every provider and the synthetic fallback.
/// The id prefix tells where a record came from: `cc_`, `na_` or `mock_`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct ArticleRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub source: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub categories: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl ArticleRecord {
    pub fn is_synthetic(&self) -> bool {
        self.id.starts_with(super::providers::synthetic::ID_PREFIX)
    }

    pub fn published_on(&self, date: NaiveDate) -> bool {
        self.published_at.date_naive() == date
    }
}

/// An upstream news API queried one calendar day (UTC) at a time.
#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_for_date(&self, date: NaiveDate, limit: usize) -> Result<Vec<ArticleRecord>>;
    fn name(&self) -> &'static str;
}

/// Whatever the backfill loop pulls a day's batch from.
#[async_trait::async_trait]
pub trait DaySource: Send + Sync {
    async fn fetch_day(&self, date: NaiveDate, limit: usize) -> Result<Vec<ArticleRecord>>;
}
