// src/cache/store.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Minimal key/value surface the result cache needs from a backing store.
/// Mirrors the commands used against Redis: GET, SETEX, DEL, KEYS, PING.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    /// Returns how many of `keys` existed and were removed.
    async fn del(&self, keys: &[String]) -> Result<u64>;
    /// Glob-style pattern; `*` matches any run of characters.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
    async fn ping(&self) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// In-process store with per-entry expiry.
///
/// Expiry is measured on tokio's clock, so tests can drive it with
/// `tokio::time::pause` / `advance`. Expired entries are treated as absent and
/// purged lazily on access.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (non-expired) entry count.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let map = self.entries();
        map.values().filter(|(_, exp)| *exp > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries stay consistent even if a holder panicked; keep serving them.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut map = self.entries();
        match map.get(key) {
            Some((v, exp)) if *exp > now => Ok(Some(v.clone())),
            Some(_) => {
                map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        if ttl.as_secs() == 0 {
            bail!("invalid expire time in 'setex' command");
        }
        let exp = Instant::now() + Duration::from_secs(ttl.as_secs());
        let mut map = self.entries();
        map.insert(key.to_string(), (value.to_string(), exp));
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let now = Instant::now();
        let mut map = self.entries();
        let mut removed = 0u64;
        for k in keys {
            if let Some((_, exp)) = map.remove(k) {
                if exp > now {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let now = Instant::now();
        let map = self.entries();
        let mut out: Vec<String> = map
            .iter()
            .filter(|(k, (_, exp))| *exp > now && glob_match(pattern, k))
            .map(|(k, _)| k.clone())
            .collect();
        out.sort();
        Ok(out)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// `*`-only glob. Enough for the `prefix*` patterns the cache issues.
pub(crate) fn glob_match(pattern: &str, s: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == s;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !s.starts_with(first) || s.len() < first.len() + last.len() || !s.ends_with(last) {
        return false;
    }

    let mut rest = &s[first.len()..s.len() - last.len()];
    for mid in &parts[1..parts.len() - 1] {
        match rest.find(mid) {
            Some(i) => rest = &rest[i + mid.len()..],
            None => return false,
        }
    }
    true
}
