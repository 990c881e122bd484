// src/cache/mod.rs
//! Content-addressed result cache.
//!
//! Keys are `sentiment:` + hex SHA-256 of the raw input text, so identical input
//! always lands on the same entry and never needs explicit invalidation.
//! Only construction may fail; every operation afterwards degrades to
//! "absent"/`false`/`0` and logs instead of returning an error.

pub mod redis_store;
pub mod store;

use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::CacheConfig;
use crate::telemetry::ensure_metrics_described;
pub use redis_store::RedisStore;
pub use store::{KvStore, MemoryStore};

pub const KEY_PREFIX: &str = "sentiment:";

/// Deterministic cache key for `text`: 64 lowercase hex chars after the prefix.
pub fn cache_key(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(KEY_PREFIX.len() + 64);
    out.push_str(KEY_PREFIX);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Outcome of a lookup. `get` collapses `Miss` and `Unavailable` into `None`;
/// `lookup` keeps them apart for callers that care.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
    Unavailable,
}

impl<T> CacheLookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            CacheLookup::Hit(v) => Some(v),
            CacheLookup::Miss | CacheLookup::Unavailable => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl ResultCache {
    /// Connect to Redis as configured. Fails loudly; callers decide once at
    /// startup whether to run without caching.
    pub async fn connect(cfg: &CacheConfig) -> anyhow::Result<Self> {
        let store = RedisStore::connect(cfg).await.map_err(|e| {
            error!(error = ?e, "failed to connect to redis");
            e
        })?;
        Ok(Self::with_store(Arc::new(store), cfg.ttl()))
    }

    pub fn with_store(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        ensure_metrics_described();
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    pub async fn lookup<T: DeserializeOwned>(&self, text: &str) -> CacheLookup<T> {
        let key = cache_key(text);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(text = %preview(text), "cache MISS");
                counter!("cache_misses_total").increment(1);
                return CacheLookup::Miss;
            }
            Err(e) => {
                error!(error = ?e, "error retrieving from cache");
                counter!("cache_errors_total").increment(1);
                return CacheLookup::Unavailable;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(v) => {
                debug!(text = %preview(text), "cache HIT");
                counter!("cache_hits_total").increment(1);
                CacheLookup::Hit(v)
            }
            Err(e) => {
                // Entry exists but does not decode into the caller's shape.
                warn!(error = %e, key = %key, "undecodable cache entry, treating as miss");
                counter!("cache_misses_total").increment(1);
                CacheLookup::Miss
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, text: &str) -> Option<T> {
        self.lookup(text).await.into_option()
    }

    /// Serialize `result` to JSON and store it for the configured TTL.
    pub async fn set<T: Serialize + ?Sized>(&self, text: &str, result: &T) -> bool {
        let serialized = match serde_json::to_string(result) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "cache value is not JSON-serializable");
                counter!("cache_errors_total").increment(1);
                return false;
            }
        };

        let key = cache_key(text);
        match self.store.set_ex(&key, &serialized, self.ttl).await {
            Ok(()) => {
                debug!(text = %preview(text), ttl_secs = self.ttl().as_secs(), "cache SET");
                true
            }
            Err(e) => {
                error!(error = ?e, "error storing in cache");
                counter!("cache_errors_total").increment(1);
                false
            }
        }
    }

    /// True only when an entry existed and was removed.
    pub async fn delete(&self, text: &str) -> bool {
        let key = cache_key(text);
        match self.store.del(&[key]).await {
            Ok(n) => n > 0,
            Err(e) => {
                error!(error = ?e, "error deleting from cache");
                counter!("cache_errors_total").increment(1);
                false
            }
        }
    }

    /// Remove every key starting with `prefix`. Returns how many were deleted.
    pub async fn clear_all(&self, prefix: &str) -> usize {
        let pattern = format!("{prefix}*");
        let keys = match self.store.keys(&pattern).await {
            Ok(k) => k,
            Err(e) => {
                error!(error = ?e, %pattern, "error listing cache keys");
                counter!("cache_errors_total").increment(1);
                return 0;
            }
        };

        if keys.is_empty() {
            info!(%pattern, "no cache entries found to clear");
            return 0;
        }

        match self.store.del(&keys).await {
            Ok(n) => {
                info!(deleted = n, %pattern, "cleared cache entries");
                n as usize
            }
            Err(e) => {
                error!(error = ?e, %pattern, "error clearing cache");
                counter!("cache_errors_total").increment(1);
                0
            }
        }
    }

    /// Shorthand for `clear_all(KEY_PREFIX)`.
    pub async fn clear_sentiment(&self) -> usize {
        self.clear_all(KEY_PREFIX).await
    }

    pub async fn ping(&self) -> bool {
        self.store.ping().await.is_ok()
    }
}

/// First 50 chars, for logs.
fn preview(text: &str) -> String {
    let mut s: String = text.chars().take(50).collect();
    if text.chars().nth(50).is_some() {
        s.push_str("...");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_prefixed_sha256_hex() {
        let k = cache_key("hello");
        assert_eq!(
            k,
            "sentiment:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        let hex = k.strip_prefix(KEY_PREFIX).unwrap();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn key_is_stable_and_input_sensitive() {
        assert_eq!(cache_key("BTC up"), cache_key("BTC up"));
        assert_ne!(cache_key("BTC up"), cache_key("BTC up "));
    }

    #[test]
    fn lookup_collapses_to_option() {
        assert_eq!(CacheLookup::Hit(1).into_option(), Some(1));
        assert_eq!(CacheLookup::<i32>::Miss.into_option(), None);
        assert_eq!(CacheLookup::<i32>::Unavailable.into_option(), None);
        assert!(CacheLookup::Hit(1).is_hit());
        assert!(!CacheLookup::<i32>::Miss.is_hit());
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(80);
        assert_eq!(preview(&long).len(), 53);
        assert_eq!(preview("short"), "short");
    }
}
