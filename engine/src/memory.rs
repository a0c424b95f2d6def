//! In-process counter cache.

use crate::backend::CounterCache;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// A [`CounterCache`] held in process memory.
///
/// Increments are atomic per key, so it serves single-node hosts and tests.
/// Counters are lost on restart, which exercises the cold-start recovery path.
#[derive(Debug, Default)]
pub struct MemoryCounter {
    counters: DashMap<String, i64>,
}

impl MemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a counter, as if the cache had been flushed.
    pub fn evict(&self, key: &str) {
        self.counters.remove(key);
    }
}

#[async_trait]
impl CounterCache for MemoryCounter {
    async fn incr(&self, key: &str) -> Result<i64> {
        let mut entry = self.counters.entry(key.to_string()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    async fn get(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.counters.get(key).map(|value| (*value).max(0) as u64))
    }

    async fn set(&self, key: &str, value: u64) -> Result<()> {
        self.counters.insert(key.to_string(), value as i64);
        Ok(())
    }
}
