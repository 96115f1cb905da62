//! Redis-backed `CacheStore` over a `deadpool-redis` connection pool.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use redis::AsyncCommands;

use crate::cache::{CacheError, CacheStore};

use super::error::InfraError;

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 200;

#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool,
}

impl RedisCacheStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool for `url`. Connections are opened lazily, so an unreachable server only
    /// surfaces as per-command errors.
    pub fn connect(url: &str, pool_size: usize) -> Result<Self, InfraError> {
        let mut config = Config::from_url(url);
        config.pool = Some(PoolConfig::new(pool_size));
        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| InfraError::cache(format!("failed to build redis pool: {err}")))?;
        Ok(Self::new(pool))
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool.get().await.map_err(CacheError::connection)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut connection = self.connection().await?;
        let value: Option<Vec<u8>> = connection
            .get(key)
            .await
            .map_err(|err| CacheError::command("GET", err))?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection().await?;
        // SET EX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        let () = connection
            .set_ex(key, value.to_vec(), seconds)
            .await
            .map_err(|err| CacheError::command("SET", err))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut connection = self.connection().await?;
        let removed: u64 = connection
            .del(key)
            .await
            .map_err(|err| CacheError::command("DEL", err))?;
        Ok(removed > 0)
    }

    fn keys_matching(&self, pattern: &str) -> BoxStream<'static, Result<String, CacheError>> {
        let pool = self.pool.clone();
        let pattern = pattern.to_string();

        // `None` marks a finished cursor walk.
        stream::try_unfold(Some(0u64), move |cursor| {
            let pool = pool.clone();
            let pattern = pattern.clone();
            async move {
                let Some(cursor) = cursor else {
                    return Ok(None);
                };
                let mut connection = pool.get().await.map_err(CacheError::connection)?;
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut connection)
                    .await
                    .map_err(|err| CacheError::command("SCAN", err))?;
                Ok::<_, CacheError>(Some((keys, (next != 0).then_some(next))))
            }
        })
        .map_ok(|keys| stream::iter(keys.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }
}
