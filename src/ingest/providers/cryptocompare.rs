// src/ingest/providers/cryptocompare.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;

use super::{day_start, http_client};
use crate::ingest::types::{ArticleRecord, NewsProvider};

const OK_TYPE: i64 = 100;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Type")]
    kind: i64,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Data", default)]
    data: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: serde_json::Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    short_description: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    published_on: i64,
    #[serde(default)]
    categories: String,
}

/// CryptoCompare news endpoint. Its only temporal filter is `lTs` ("published
/// before"), so the day window is enforced here after the fact.
pub struct CryptoCompareProvider {
    client: reqwest::Client,
    base: String,
    api_key: String,
}

impl CryptoCompareProvider {
    pub fn new(base: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base: base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn to_record(item: Item, fetched_at: DateTime<Utc>) -> Option<ArticleRecord> {
        let published_at = DateTime::from_timestamp(item.published_on, 0)?;
        let id = match &item.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let source = if item.source.is_empty() {
            "CryptoCompare".to_string()
        } else {
            item.source
        };
        let categories = item
            .categories
            .split('|')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        Some(ArticleRecord {
            id: format!("cc_{id}"),
            title: item.title,
            content: item.body,
            summary: item.short_description,
            source,
            url: item.url,
            published_at,
            categories,
            fetched_at,
        })
    }
}

#[async_trait]
impl NewsProvider for CryptoCompareProvider {
    async fn fetch_for_date(&self, date: NaiveDate, limit: usize) -> Result<Vec<ArticleRecord>> {
        // Everything published before the end of `date`; older days are dropped below.
        let next_day = date
            .checked_add_days(Days::new(1))
            .context("date out of range")?;
        let lts = day_start(next_day).timestamp();

        let url = format!("{}/data/v2/news/", self.base);
        let env: Envelope = self
            .client
            .get(&url)
            .header("Authorization", format!("Apikey {}", self.api_key))
            .query(&[
                ("lang", "EN".to_string()),
                ("categories", "BTC,ETH,BLOCKCHAIN".to_string()),
                ("lTs", lts.to_string()),
            ])
            .send()
            .await
            .context("cryptocompare get()")?
            .error_for_status()
            .context("cryptocompare non-2xx")?
            .json()
            .await
            .context("parsing cryptocompare json")?;

        if env.kind != OK_TYPE {
            let msg = if env.message.is_empty() {
                "Unknown"
            } else {
                env.message.as_str()
            };
            bail!("cryptocompare API error: {msg}");
        }

        let fetched_at = Utc::now();
        Ok(env
            .data
            .into_iter()
            .filter_map(|it| Self::to_record(it, fetched_at))
            .filter(|a| a.published_on(date))
            .take(limit)
            .collect())
    }

    fn name(&self) -> &'static str {
        "CryptoCompare"
    }
}
