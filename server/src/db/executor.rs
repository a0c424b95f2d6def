//! [`Executor`] over a MySQL pool.

use super::Pool;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::types::Json;
use sqlx::{Column, MySql, Row, TypeInfo};
use tidemark_engine::{quote_ident, Error, Executor, FieldMap, Result};

type MySqlQuery<'q> = sqlx::query::Query<'q, MySql, MySqlArguments>;

/// Runs engine statements on a MySQL pool, decoding rows into field maps.
#[derive(Debug, Clone)]
pub struct MySqlExecutor {
    pool: Pool,
}

impl MySqlExecutor {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl Executor for MySqlExecutor {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<FieldMap>> {
        let rows = bind_all(sqlx::query(sql), args)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::executor)?;

        rows.iter()
            .map(decode_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(Error::executor)
    }

    async fn insert(&self, table: &str, fields: &FieldMap) -> Result<()> {
        let sql = insert_sql(table, fields);
        bind_all(sqlx::query(&sql), fields.values())
            .execute(&self.pool)
            .await
            .map_err(Error::executor)?;
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        fields: &FieldMap,
        filter: &str,
        args: &[Value],
    ) -> Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let sql = update_sql(table, fields, filter);
        let result = bind_all(sqlx::query(&sql), fields.values().chain(args))
            .execute(&self.pool)
            .await
            .map_err(Error::executor)?;
        Ok(result.rows_affected())
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> Result<u64> {
        let result = bind_all(sqlx::query(sql), args)
            .execute(&self.pool)
            .await
            .map_err(Error::executor)?;
        Ok(result.rows_affected())
    }
}

fn insert_sql(table: &str, fields: &FieldMap) -> String {
    let columns: Vec<String> = fields.keys().map(|k| quote_ident(k)).collect();
    let placeholders = vec!["?"; fields.len()];
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(","),
        placeholders.join(",")
    )
}

fn update_sql(table: &str, fields: &FieldMap, filter: &str) -> String {
    let assignments: Vec<String> = fields
        .keys()
        .map(|k| format!("{}=?", quote_ident(k)))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(table),
        assignments.join(","),
        filter
    )
}

fn bind_all<'q, I>(query: MySqlQuery<'q>, args: I) -> MySqlQuery<'q>
where
    I: IntoIterator<Item = &'q Value>,
{
    args.into_iter()
        .fold(query, |query, value| bind_value(query, value))
}

fn bind_value<'q>(query: MySqlQuery<'q>, value: &'q Value) -> MySqlQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => query.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => query.bind(Json(value)),
    }
}

fn decode_row(row: &MySqlRow) -> std::result::Result<FieldMap, sqlx::Error> {
    let mut fields = FieldMap::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())?;
        fields.insert(column.name().to_string(), value);
    }
    Ok(fields)
}

/// Decode one column by its reported MySQL type name.
fn decode_column(
    row: &MySqlRow,
    index: usize,
    type_name: &str,
) -> std::result::Result<Value, sqlx::Error> {
    let value = match type_name {
        "NULL" => None,
        "BOOLEAN" => row.try_get::<Option<bool>, _>(index)?.map(Value::from),
        t if t.ends_with(" UNSIGNED") => {
            row.try_get::<Option<u64>, _>(index)?.map(Value::from)
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<Option<i64>, _>(index)?.map(Value::from)
        }
        "YEAR" => row.try_get_unchecked::<Option<i64>, _>(index)?.map(Value::from),
        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|f| Value::from(f64::from(f))),
        "DOUBLE" => row.try_get::<Option<f64>, _>(index)?.map(Value::from),
        "JSON" => row
            .try_get::<Option<Json<Value>>, _>(index)?
            .map(|json| json.0),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)?
            .map(|dt| Value::from(dt.to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)?
            .map(|d| Value::from(d.to_string())),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)?
            .map(|t| Value::from(t.to_string())),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
            .try_get_unchecked::<Option<Vec<u8>>, _>(index)?
            .map(|bytes| Value::from(String::from_utf8_lossy(&bytes).into_owned())),
        // Text, DECIMAL, ENUM and SET arrive as strings on the wire.
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)?
            .map(Value::from),
    };
    Ok(value.unwrap_or(Value::Null))
}
