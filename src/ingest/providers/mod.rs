// src/ingest/providers/mod.rs
pub mod cryptocompare;
pub mod newsapi;
pub mod synthetic;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::time::Duration;

pub use cryptocompare::CryptoCompareProvider;
pub use newsapi::NewsApiProvider;

/// Midnight UTC at the start of `date`.
pub(crate) fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

pub(crate) fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;
    reqwest::Client::builder()
        .user_agent(concat!("crypto-news-sentinel/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .context("building provider http client")
}
