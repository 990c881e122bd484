// src/cache/redis_store.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;

use super::store::KvStore;
use crate::config::CacheConfig;

/// Redis-backed store. One multiplexed connection, cloned per command.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    /// Connect and PING once. This is the only place a store failure is
    /// reported to the caller as an error.
    pub async fn connect(cfg: &CacheConfig) -> Result<Self> {
        let url = cfg.redis_url();
        let client = redis::Client::open(url.as_str())
            .with_context(|| format!("invalid redis url {url}"))?;

        let timeout = cfg.timeout();
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| anyhow!("redis connect timed out after {timeout:?}"))?
            .with_context(|| format!("connecting to redis at {}:{}", cfg.host, cfg.port))?;

        let store = Self { conn, timeout };
        store.ping().await.context("initial redis PING")?;

        tracing::info!(host = %cfg.host, port = cfg.port, db = cfg.db, "connected to redis");
        Ok(store)
    }

    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.with_context(|| format!("redis {op}")),
            Err(_) => Err(anyhow!("redis {op} timed out after {:?}", self.timeout)),
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        self.run("GET", async move {
            redis::cmd("GET").arg(key).query_async(&mut conn).await
        })
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let secs = ttl.as_secs();
        self.run("SETEX", async move {
            redis::cmd("SETEX")
                .arg(key)
                .arg(secs)
                .arg(value)
                .query_async(&mut conn)
                .await
        })
        .await
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        self.run("DEL", async move {
            redis::cmd("DEL").arg(keys).query_async(&mut conn).await
        })
        .await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        self.run("KEYS", async move {
            redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let pong: String = self
            .run("PING", async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        if pong.eq_ignore_ascii_case("PONG") {
            Ok(())
        } else {
            Err(anyhow!("unexpected PING reply: {pong}"))
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
