//! Redis-backed version counters.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult};
use tidemark_engine::{CounterCache, Error, Result};

/// [`CounterCache`] over a multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisCounter {
    connection: MultiplexedConnection,
}

impl RedisCounter {
    /// Connect to the Redis server at `url`.
    pub async fn connect(url: &str) -> RedisResult<Self> {
        let client = Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl CounterCache for RedisCounter {
    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.connection.clone();
        conn.incr(key, 1).await.map_err(Error::cache)
    }

    async fn get(&self, key: &str) -> Result<Option<u64>> {
        let mut conn = self.connection.clone();
        let value: Option<i64> = conn.get(key).await.map_err(Error::cache)?;
        // A counter driven below zero reads as unset.
        Ok(value.and_then(|v| u64::try_from(v).ok()))
    }

    async fn set(&self, key: &str, value: u64) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(Error::cache)
    }
}
