//! Test doubles for the collaborator contracts.
//!
//! Available to this crate's tests and, through the `testing` feature, to
//! downstream crates.

use crate::backend::{CounterCache, Executor, IdMaker};
use crate::error::{Error, Result};
use crate::record::FieldMap;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build a row from a JSON object literal. Non-objects yield an empty row.
pub fn row(value: Value) -> FieldMap {
    match value {
        Value::Object(fields) => fields,
        _ => FieldMap::new(),
    }
}

/// One call observed by [`ScriptedExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query {
        sql: String,
        args: Vec<Value>,
    },
    Insert {
        table: String,
        fields: FieldMap,
    },
    Update {
        table: String,
        fields: FieldMap,
        filter: String,
        args: Vec<Value>,
    },
    Exec {
        sql: String,
        args: Vec<Value>,
    },
}

/// Executor that records every call and replays scripted results.
///
/// Queries pop from the query script (empty script: no rows); inserts,
/// updates and execs pop from the write script (empty script: one row
/// affected).
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    calls: Mutex<Vec<Call>>,
    queries: Mutex<VecDeque<Result<Vec<FieldMap>>>>,
    writes: Mutex<VecDeque<Result<u64>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next query.
    pub fn push_rows(&self, rows: Vec<FieldMap>) -> &Self {
        lock(&self.queries).push_back(Ok(rows));
        self
    }

    /// Queue a failure for the next query.
    pub fn push_query_error(&self, message: &str) -> &Self {
        lock(&self.queries).push_back(Err(Error::Executor(message.to_string())));
        self
    }

    /// Queue the affected-row count of the next write.
    pub fn push_affected(&self, rows: u64) -> &Self {
        lock(&self.writes).push_back(Ok(rows));
        self
    }

    /// Queue a failure for the next write.
    pub fn push_write_error(&self, message: &str) -> &Self {
        lock(&self.writes).push_back(Err(Error::Executor(message.to_string())));
        self
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// The SQL of every query observed so far.
    pub fn query_sql(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Query { sql, .. } => Some(sql),
                _ => None,
            })
            .collect()
    }

    fn next_write(&self) -> Result<u64> {
        lock(&self.writes).pop_front().unwrap_or(Ok(1))
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<FieldMap>> {
        lock(&self.calls).push(Call::Query {
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        lock(&self.queries).pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn insert(&self, table: &str, fields: &FieldMap) -> Result<()> {
        lock(&self.calls).push(Call::Insert {
            table: table.to_string(),
            fields: fields.clone(),
        });
        self.next_write().map(|_| ())
    }

    async fn update(
        &self,
        table: &str,
        fields: &FieldMap,
        filter: &str,
        args: &[Value],
    ) -> Result<u64> {
        lock(&self.calls).push(Call::Update {
            table: table.to_string(),
            fields: fields.clone(),
            filter: filter.to_string(),
            args: args.to_vec(),
        });
        self.next_write()
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> Result<u64> {
        lock(&self.calls).push(Call::Exec {
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        self.next_write()
    }
}

/// Counter cache whose every operation fails.
#[derive(Debug, Default)]
pub struct BrokenCounter;

#[async_trait]
impl CounterCache for BrokenCounter {
    async fn incr(&self, _key: &str) -> Result<i64> {
        Err(Error::Cache("connection refused".into()))
    }

    async fn get(&self, _key: &str) -> Result<Option<u64>> {
        Err(Error::Cache("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: u64) -> Result<()> {
        Err(Error::Cache("connection refused".into()))
    }
}

/// Id maker replaying a fixed list, then falling back to `ID<n>`.
#[derive(Debug, Default)]
pub struct SequenceIds {
    queued: Mutex<VecDeque<String>>,
    issued: AtomicUsize,
}

impl SequenceIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queued: Mutex::new(ids.into_iter().map(Into::into).collect()),
            issued: AtomicUsize::new(0),
        }
    }
}

impl IdMaker for SequenceIds {
    fn next_id(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.queued)
            .pop_front()
            .unwrap_or_else(|| format!("ID{:06}", n))
    }
}
