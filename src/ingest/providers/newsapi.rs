// src/ingest/providers/newsapi.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::time::Duration;

use super::http_client;
use crate::ingest::types::{ArticleRecord, NewsProvider};

const QUERY: &str = "cryptocurrency OR blockchain OR bitcoin OR ethereum";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    source: Option<ItemSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    name: Option<String>,
}

/// Stable short id from the article URL, or from title + publish time when the
/// URL is missing so url-less items do not collapse into one id.
fn article_id(url: &str, title: &str, published_at: &str) -> String {
    let digest = if url.is_empty() {
        Sha256::digest(format!("{title}|{published_at}").as_bytes())
    } else {
        Sha256::digest(url.as_bytes())
    };
    let mut out = String::with_capacity(11);
    out.push_str("na_");
    for b in digest.iter().take(4) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// NewsAPI `/v2/everything`. The key goes in the query string.
pub struct NewsApiProvider {
    client: reqwest::Client,
    base: String,
    api_key: String,
}

impl NewsApiProvider {
    pub fn new(base: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base: base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn to_record(item: Item, fetched_at: DateTime<Utc>) -> Option<ArticleRecord> {
        let raw_published = item.published_at.unwrap_or_default();
        let published_at = DateTime::parse_from_rfc3339(&raw_published)
            .ok()?
            .with_timezone(&Utc);
        let url = item.url.unwrap_or_default();
        let title = item.title.unwrap_or_default();

        Some(ArticleRecord {
            id: article_id(&url, &title, &raw_published),
            title,
            content: item.content.unwrap_or_default(),
            summary: item.description.unwrap_or_default(),
            source: item
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "NewsAPI".to_string()),
            url,
            published_at,
            categories: vec!["crypto".to_string(), "blockchain".to_string()],
            fetched_at,
        })
    }
}

#[async_trait]
impl NewsProvider for NewsApiProvider {
    async fn fetch_for_date(&self, date: NaiveDate, limit: usize) -> Result<Vec<ArticleRecord>> {
        let next_day = date
            .checked_add_days(Days::new(1))
            .context("date out of range")?;

        let url = format!("{}/v2/everything", self.base);
        let rsp = self
            .client
            .get(&url)
            .query(&[
                ("q", QUERY.to_string()),
                ("language", "en".to_string()),
                ("sortBy", "publishedAt".to_string()),
                ("pageSize", limit.clamp(1, 100).to_string()),
                ("from", date.format("%Y-%m-%d").to_string()),
                ("to", next_day.format("%Y-%m-%d").to_string()),
                ("apiKey", self.api_key.clone()),
            ])
            .send()
            .await
            // without_url: the URL carries the API key.
            .map_err(|e| e.without_url())
            .context("newsapi get()")?;

        let status = rsp.status();
        let body = rsp.text().await.context("reading newsapi body")?;
        if !status.is_success() {
            // Error pages are not always JSON (e.g. a proxy's 502).
            let msg = serde_json::from_str::<Envelope>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Unknown".to_string());
            bail!("newsapi error ({status}): {msg}");
        }
        let env: Envelope = serde_json::from_str(&body)
            .with_context(|| format!("parsing newsapi json ({status})"))?;
        if env.status == "error" {
            let msg = env.message.unwrap_or_else(|| "Unknown".to_string());
            bail!("newsapi error ({status}): {msg}");
        }

        // `to` is inclusive of the next day's date, so trim to `date` here too.
        let fetched_at = Utc::now();
        Ok(env
            .articles
            .into_iter()
            .filter_map(|it| Self::to_record(it, fetched_at))
            .filter(|a| a.published_on(date))
            .take(limit)
            .collect())
    }

    fn name(&self) -> &'static str {
        "NewsAPI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_id_is_stable_and_prefixed() {
        let a = article_id("https://example.test/a", "t", "2025-01-01T00:00:00Z");
        assert_eq!(a, article_id("https://example.test/a", "other", "2025-02-02T00:00:00Z"));
        assert_ne!(a, article_id("https://example.test/b", "t", "2025-01-01T00:00:00Z"));
        assert!(a.starts_with("na_"));
        assert_eq!(a.len(), 11);
    }

    #[test]
    fn missing_url_ids_come_from_title_and_time() {
        let a = article_id("", "ETH upgrade", "2025-04-10T08:00:00Z");
        let b = article_id("", "BTC dips", "2025-04-10T08:00:00Z");
        let c = article_id("", "ETH upgrade", "2025-04-10T09:00:00Z");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, article_id("", "ETH upgrade", "2025-04-10T08:00:00Z"));
        assert!(a.starts_with("na_") && a.len() == 11);
    }
}
