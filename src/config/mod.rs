// src/config/mod.rs
//! Explicit configuration for the cache, the alert dispatcher, the upstream news
//! providers and the backfill job.
//!
//! Defaults are applied once here; components receive their section by value
//! and never read the environment on their own.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

// ------------------------------------------------------------
// Cache
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    /// Entry lifetime; 24h unless overridden.
    pub ttl_secs: u64,
    /// Per-command timeout against the store.
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            ttl_secs: 24 * 60 * 60,
            timeout_secs: 5,
        }
    }
}

impl CacheConfig {
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ------------------------------------------------------------
// Notifications
// ------------------------------------------------------------

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotifyConfig {
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    pub dry_run: bool,
    /// Alerts fire only for scores strictly above this value.
    pub threshold: f64,
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_secs: u64,
    /// Bot API root; overridden in tests to point at a local mock.
    pub api_base: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_id: None,
            dry_run: false,
            threshold: 0.8,
            max_retries: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 10_000,
            timeout_secs: 10,
            api_base: default_api_base(),
        }
    }
}

impl NotifyConfig {
    /// Convenience for callers that only have credentials at hand.
    pub fn with_credentials(token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            bot_token: Some(token.into()),
            channel_id: Some(channel.into()),
            ..Self::default()
        }
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ------------------------------------------------------------
// Upstream news providers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub cryptocompare_api_key: Option<String>,
    pub newsapi_api_key: Option<String>,
    pub cryptocompare_base: String,
    pub newsapi_base: String,
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            cryptocompare_api_key: None,
            newsapi_api_key: None,
            cryptocompare_base: "https://min-api.cryptocompare.com".to_string(),
            newsapi_base: "https://newsapi.org".to_string(),
            timeout_secs: 15,
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ------------------------------------------------------------
// Backfill
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackfillConfig {
    pub days: u32,
    pub articles_per_day: usize,
    /// Total attempts per day (not retries).
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Pause between consecutive days.
    pub rate_limit_delay_ms: u64,
    /// Upper bound on synthetic records generated for an empty day.
    pub mock_count: usize,
    pub data_dir: PathBuf,
    pub verbose: bool,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            days: 30,
            articles_per_day: 20,
            max_retries: 3,
            retry_delay_ms: 5_000,
            rate_limit_delay_ms: 2_000,
            mock_count: 5,
            data_dir: PathBuf::from("data/backfill"),
            verbose: false,
        }
    }
}

impl BackfillConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

// ------------------------------------------------------------
// Aggregate
// ------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub notify: NotifyConfig,
    pub providers: ProvidersConfig,
    pub backfill: BackfillConfig,
}

impl AppConfig {
    /// Load `.env` (if present) and read the environment once.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_env_vars()
    }

    /// Read the environment without touching `.env`; unset or unparsable
    /// variables keep their defaults.
    pub fn from_env_vars() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_str("REDIS_HOST") {
            cfg.cache.host = v;
        }
        if let Some(v) = env_parse("REDIS_PORT") {
            cfg.cache.port = v;
        }
        if let Some(v) = env_parse("REDIS_DB") {
            cfg.cache.db = v;
        }
        if let Some(v) = env_parse("CACHE_TTL_SECONDS") {
            cfg.cache.ttl_secs = v;
        }

        cfg.notify.bot_token = env_str("TELEGRAM_BOT_TOKEN");
        cfg.notify.channel_id = env_str("TELEGRAM_CHANNEL_ID");
        if let Some(v) = env_flag("ALERT_DRY_RUN") {
            cfg.notify.dry_run = v;
        }
        if let Some(v) = env_parse("ALERT_THRESHOLD") {
            cfg.notify.threshold = v;
        }

        cfg.providers.cryptocompare_api_key = env_str("CRYPTOCOMPARE_API_KEY");
        cfg.providers.newsapi_api_key = env_str("NEWSAPI_API_KEY");

        if let Some(v) = env_parse("BACKFILL_DAYS") {
            cfg.backfill.days = v;
        }
        if let Some(v) = env_str("BACKFILL_DATA_DIR") {
            cfg.backfill.data_dir = PathBuf::from(v);
        }
        if let Some(v) = env_flag("BACKFILL_VERBOSE") {
            cfg.backfill.verbose = v;
        }

        cfg
    }

    /// Load from a TOML file. Missing sections/keys fall back to defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AppConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Blank credentials count as absent.
    fn sanitize(&mut self) {
        for slot in [
            &mut self.notify.bot_token,
            &mut self.notify.channel_id,
            &mut self.providers.cryptocompare_api_key,
            &mut self.providers.newsapi_api_key,
        ] {
            if slot.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *slot = None;
            }
        }
    }
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_str(key).and_then(|v| v.parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    env_str(key).map(|v| {
        matches!(
            v.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}
