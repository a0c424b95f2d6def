//! Collaborator contracts consumed by the engine.
//!
//! The engine never talks to a database or cache directly. Hosts provide an
//! [`Executor`] for the relational store, a [`CounterCache`] for the shared
//! version counters and an [`IdMaker`] for primary keys.

use crate::error::Result;
use crate::record::FieldMap;
use async_trait::async_trait;
use serde_json::Value;

/// Relational statement executor.
///
/// All statements use positional `?` placeholders bound in call order.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a query and return its rows.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<FieldMap>>;

    /// Insert one row built from `fields`.
    async fn insert(&self, table: &str, fields: &FieldMap) -> Result<()>;

    /// Update rows matching `filter` with `fields`, returning the affected count.
    async fn update(
        &self,
        table: &str,
        fields: &FieldMap,
        filter: &str,
        args: &[Value],
    ) -> Result<u64>;

    /// Run a statement that returns no rows, returning the affected count.
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<u64>;
}

/// Shared counter store (Redis in production).
#[async_trait]
pub trait CounterCache: Send + Sync {
    /// Atomically increment `key`, creating it at 0 first if absent.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Plain read of `key`.
    async fn get(&self, key: &str) -> Result<Option<u64>>;

    /// Absolute write of `key`.
    async fn set(&self, key: &str, value: u64) -> Result<()>;
}

/// Source of candidate primary keys. Values are expected to be short and
/// unlikely to collide, but uniqueness is checked by the caller.
pub trait IdMaker: Send + Sync {
    fn next_id(&self) -> String;
}

impl<F> IdMaker for F
where
    F: Fn() -> String + Send + Sync,
{
    fn next_id(&self) -> String {
        self()
    }
}

/// Run a query and return the first column of its first row.
///
/// No rows yields `Value::Null`.
pub async fn query_scalar(executor: &dyn Executor, sql: &str, args: &[Value]) -> Result<Value> {
    let rows = executor.query(sql, args).await?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next().map(|(_, value)| value))
        .unwrap_or(Value::Null))
}
