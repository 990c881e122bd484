// src/ingest/fetcher.rs
use anyhow::Result;
use chrono::NaiveDate;
use metrics::counter;
use std::collections::HashSet;

use crate::config::ProvidersConfig;
use crate::ingest::providers::{synthetic, CryptoCompareProvider, NewsApiProvider};
use crate::ingest::types::{ArticleRecord, DaySource, NewsProvider};

/// Queries every configured provider for one day and falls back to synthetic
/// records when none of them produced anything.
pub struct HistoricalFetcher {
    providers: Vec<Box<dyn NewsProvider>>,
    mock_count: usize,
}

impl HistoricalFetcher {
    pub fn new(providers: Vec<Box<dyn NewsProvider>>, mock_count: usize) -> Self {
        Self {
            providers,
            mock_count,
        }
    }

    /// One provider per API key present in `cfg`.
    pub fn from_config(cfg: &ProvidersConfig, mock_count: usize) -> Result<Self> {
        let mut providers: Vec<Box<dyn NewsProvider>> = Vec::new();
        if let Some(key) = cfg.cryptocompare_api_key.as_deref() {
            providers.push(Box::new(CryptoCompareProvider::new(
                &cfg.cryptocompare_base,
                key,
                cfg.timeout(),
            )?));
        }
        if let Some(key) = cfg.newsapi_api_key.as_deref() {
            providers.push(Box::new(NewsApiProvider::new(
                &cfg.newsapi_base,
                key,
                cfg.timeout(),
            )?));
        }
        if providers.is_empty() {
            tracing::warn!("no news API keys configured, backfill will use mock data");
        }
        Ok(Self::new(providers, mock_count))
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn fetch_for_date(&self, date: NaiveDate, limit: usize) -> Vec<ArticleRecord> {
        tracing::info!(%date, "fetching news");

        let mut articles = Vec::new();
        for p in &self.providers {
            match p.fetch_for_date(date, limit).await {
                Ok(mut v) => {
                    tracing::info!(provider = p.name(), count = v.len(), "provider fetched");
                    articles.append(&mut v);
                }
                Err(e) => {
                    tracing::warn!(error = ?e, provider = p.name(), "provider fetch failed");
                    counter!("backfill_provider_errors_total").increment(1);
                }
            }
        }

        // Ids must be unique within a day's batch; keep the first occurrence.
        let mut seen = HashSet::new();
        articles.retain(|a| seen.insert(a.id.clone()));

        if articles.is_empty() {
            articles = synthetic::synthetic_articles(date, limit.min(self.mock_count));
            tracing::info!(count = articles.len(), "using mock data");
        }
        articles
    }
}

#[async_trait::async_trait]
impl DaySource for HistoricalFetcher {
    async fn fetch_day(&self, date: NaiveDate, limit: usize) -> Result<Vec<ArticleRecord>> {
        Ok(self.fetch_for_date(date, limit).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::Utc;

    struct Failing;

    #[async_trait::async_trait]
    impl NewsProvider for Failing {
        async fn fetch_for_date(&self, _: NaiveDate, _: usize) -> Result<Vec<ArticleRecord>> {
            Err(anyhow!("upstream 503"))
        }
        fn name(&self) -> &'static str {
            "Failing"
        }
    }

    struct Fixed(Vec<&'static str>);

    #[async_trait::async_trait]
    impl NewsProvider for Fixed {
        async fn fetch_for_date(&self, date: NaiveDate, _: usize) -> Result<Vec<ArticleRecord>> {
            let mut v = synthetic::synthetic_articles(date, self.0.len());
            for (a, id) in v.iter_mut().zip(&self.0) {
                a.id = id.to_string();
                a.source = "Fixed".into();
            }
            Ok(v)
        }
        fn name(&self) -> &'static str {
            "Fixed"
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()
    }

    #[tokio::test]
    async fn no_providers_yields_synthetic_batch() {
        let f = HistoricalFetcher::from_config(&ProvidersConfig::default(), 5).unwrap();
        assert!(f.provider_names().is_empty());
        let v = f.fetch_for_date(day(), 20).await;
        assert_eq!(v.len(), 5);
        assert!(v.iter().all(|a| a.id.starts_with("mock_")));
    }

    #[tokio::test]
    async fn synthetic_batch_respects_limit() {
        let f = HistoricalFetcher::new(vec![], 5);
        assert_eq!(f.fetch_for_date(day(), 2).await.len(), 2);
    }

    #[tokio::test]
    async fn failing_provider_does_not_block_others() {
        let f = HistoricalFetcher::new(
            vec![Box::new(Failing), Box::new(Fixed(vec!["cc_1", "cc_2"]))],
            5,
        );
        let v = f.fetch_for_date(day(), 20).await;
        let ids: Vec<_> = v.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["cc_1", "cc_2"]);
    }

    #[tokio::test]
    async fn all_failing_falls_back_to_mock() {
        let f = HistoricalFetcher::new(vec![Box::new(Failing), Box::new(Failing)], 3);
        let v = f.fetch_for_date(day(), 20).await;
        assert_eq!(v.len(), 3);
        assert!(v.iter().all(ArticleRecord::is_synthetic));
    }

    #[tokio::test]
    async fn duplicate_ids_within_a_day_are_dropped() {
        let f = HistoricalFetcher::new(
            vec![
                Box::new(Fixed(vec!["na_aa", "na_bb"])),
                Box::new(Fixed(vec!["na_bb", "na_cc"])),
            ],
            5,
        );
        let v = f.fetch_for_date(day(), 20).await;
        let ids: Vec<_> = v.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["na_aa", "na_bb", "na_cc"]);
        assert!(v.iter().all(|a| a.fetched_at <= Utc::now()));
    }
}
