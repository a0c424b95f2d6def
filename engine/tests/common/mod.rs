//! An in-memory relational executor understanding the statements the engine
//! renders: single-table selects with `AND`-joined conditions, `ORDER BY`,
//! `LIMIT ?,?`, `COUNT(*)` and `MAX(..)` projections, plus inserts, updates
//! and deletes.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tidemark_engine::{Context, Error, Executor, FieldMap, MemoryCounter, Result};

#[derive(Default)]
pub struct MemoryDb {
    tables: Mutex<HashMap<String, Vec<FieldMap>>>,
    bool_columns: HashSet<String>,
}

impl MemoryDb {
    /// `deleted` behaves like a `TINYINT(1)` column and reads back as a bool.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            bool_columns: ["deleted".to_string()].into_iter().collect(),
        }
    }

    pub fn rows(&self, table: &str) -> Vec<FieldMap> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn store(&self, mut fields: FieldMap) -> FieldMap {
        for column in &self.bool_columns {
            if let Some(value) = fields.get_mut(column) {
                *value = Value::Bool(truthy(value));
            }
        }
        fields
    }
}

pub fn context(db: &Arc<MemoryDb>, cache: &Arc<MemoryCounter>) -> Context {
    Context::new(db.clone(), cache.clone())
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(s) => !s.is_empty() && s != "0",
        _ => false,
    }
}

fn column_name(expr: &str) -> String {
    expr.rsplit('.').next().unwrap_or(expr).trim().trim_matches('`').to_string()
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Bool(x), other) | (other, Value::Bool(x)) => *x == truthy(other),
        _ => a == b,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

enum Limit {
    Bound,
    Fixed(usize),
    Unbounded,
}

enum Condition {
    Eq(String, Value),
    Between(String, u64, u64),
}

impl Condition {
    fn matches(&self, row: &FieldMap) -> bool {
        match self {
            Condition::Eq(column, expected) => row
                .get(column)
                .map(|actual| loose_eq(actual, expected))
                .unwrap_or(false),
            Condition::Between(column, low, high) => row
                .get(column)
                .and_then(Value::as_u64)
                .map(|v| v >= *low && v <= *high)
                .unwrap_or(false),
        }
    }
}

fn parse_conditions(clause: &str, args: &mut std::vec::IntoIter<Value>) -> Result<Vec<Condition>> {
    let clause = clause.replace("BETWEEN ? AND ?", "BETWEEN ?~?");
    let mut conditions = Vec::new();
    for part in clause.split(" AND ") {
        let part = part.trim().trim_start_matches('(').trim_end_matches(')');
        if let Some(column) = part.strip_suffix(" BETWEEN ?~?") {
            let low = args.next().and_then(|v| v.as_u64()).unwrap_or(0);
            let high = args.next().and_then(|v| v.as_u64()).unwrap_or(0);
            conditions.push(Condition::Between(column_name(column), low, high));
        } else if let Some((column, value)) = part.split_once('=') {
            let value = match value.trim() {
                "?" => args.next().unwrap_or(Value::Null),
                literal if literal.starts_with('\'') => {
                    Value::String(literal.trim_matches('\'').to_string())
                }
                literal => literal
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| Error::Executor(format!("unsupported literal {}", literal)))?,
            };
            conditions.push(Condition::Eq(column_name(column), value));
        } else {
            return Err(Error::Executor(format!("unsupported condition {}", part)));
        }
    }
    Ok(conditions)
}

fn table_name(token: &str) -> String {
    token.trim().trim_matches('`').to_string()
}

#[async_trait]
impl Executor for MemoryDb {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<FieldMap>> {
        let mut args = args.to_vec().into_iter();
        let body = sql
            .strip_prefix("SELECT ")
            .ok_or_else(|| Error::Executor(format!("unsupported statement {}", sql)))?;
        let (projection, rest) = body
            .split_once(" FROM ")
            .ok_or_else(|| Error::Executor("missing FROM".into()))?;

        let (rest, limit) = if let Some((rest, _)) = rest.split_once(" LIMIT ?,?") {
            (rest, Limit::Bound)
        } else if let Some((rest, n)) = rest.rsplit_once(" LIMIT ") {
            (rest, Limit::Fixed(n.trim().parse().unwrap_or(usize::MAX)))
        } else {
            (rest, Limit::Unbounded)
        };
        let (rest, order_by) = match rest.split_once(" ORDER BY ") {
            Some((rest, order)) => (rest, Some(order.to_string())),
            None => (rest, None),
        };
        let (table, filter) = match rest.split_once(" WHERE ") {
            Some((table, filter)) => (table_name(table), Some(filter)),
            None => (table_name(rest), None),
        };

        let conditions = match filter {
            Some(filter) => parse_conditions(filter, &mut args)?,
            None => Vec::new(),
        };

        let mut rows: Vec<FieldMap> = self
            .rows(&table)
            .into_iter()
            .filter(|row| conditions.iter().all(|c| c.matches(row)))
            .collect();

        if let Some(order_by) = order_by {
            let descending = order_by.trim().ends_with(" DESC");
            let column = column_name(order_by.trim().trim_end_matches(" DESC"));
            rows.sort_by(|a, b| compare(a.get(&column), b.get(&column)));
            if descending {
                rows.reverse();
            }
        }

        match limit {
            Limit::Bound => {
                let start = args.next().and_then(|v| v.as_u64()).unwrap_or(0) as usize;
                let num = args.next().and_then(|v| v.as_u64()).unwrap_or(0) as usize;
                rows = rows.into_iter().skip(start).take(num).collect();
            }
            Limit::Fixed(num) => rows.truncate(num),
            Limit::Unbounded => {}
        }

        if projection == "COUNT(*)" {
            let mut count = FieldMap::new();
            count.insert("COUNT(*)".into(), json!(rows.len()));
            return Ok(vec![count]);
        }

        if let Some(inner) = projection.strip_prefix("MAX(") {
            let column = column_name(inner.trim_end_matches(')'));
            let max = rows.iter().filter_map(|r| r.get(&column)?.as_u64()).max();
            let mut result = FieldMap::new();
            result.insert(projection.to_string(), max.map(Value::from).unwrap_or(Value::Null));
            return Ok(vec![result]);
        }

        if projection.trim() == "*" {
            return Ok(rows);
        }

        let columns: Vec<String> = projection.split(',').map(column_name).collect();
        Ok(rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                    .collect()
            })
            .collect())
    }

    async fn insert(&self, table: &str, fields: &FieldMap) -> Result<()> {
        let row = self.store(fields.clone());
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        fields: &FieldMap,
        filter: &str,
        args: &[Value],
    ) -> Result<u64> {
        let mut args = args.to_vec().into_iter();
        let conditions = parse_conditions(filter, &mut args)?;
        let patch = self.store(fields.clone());

        let mut tables = self.tables.lock().unwrap();
        let mut affected = 0;
        for row in tables.entry(table.to_string()).or_default().iter_mut() {
            if conditions.iter().all(|c| c.matches(row)) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> Result<u64> {
        let mut args = args.to_vec().into_iter();
        let rest = sql
            .strip_prefix("DELETE FROM ")
            .ok_or_else(|| Error::Executor(format!("unsupported statement {}", sql)))?;
        let (table, filter) = rest
            .split_once(" WHERE ")
            .ok_or_else(|| Error::Executor("missing WHERE".into()))?;
        let conditions = parse_conditions(filter, &mut args)?;

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table_name(table)).or_default();
        let before = rows.len();
        rows.retain(|row| !conditions.iter().all(|c| c.matches(row)));
        Ok((before - rows.len()) as u64)
    }
}
