//! Row handlers - point reads, pages and writes on one table.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tidemark_engine::{quote_ident, FieldMap, ListOptions, Table};

/// Default page size.
const DEFAULT_LIMIT: u64 = 100;

/// Maximum page size.
const MAX_LIMIT: u64 = 1000;

/// Query parameters for a page of rows.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// One page of active rows.
#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub rows: Vec<FieldMap>,
    /// Active rows in the whole table
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Response for a created row.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Fetch one active row.
pub async fn handle_get(table: &Table, id: &str) -> Result<FieldMap> {
    table.get::<FieldMap>(id).await?.ok_or_else(|| {
        AppError::NotFound(format!("{} has no row {}", table.def().table(), id))
    })
}

/// Fetch a page of active rows ordered by primary key.
pub async fn handle_page(table: &Table, query: PageQuery) -> Result<PageResponse> {
    let offset = query.offset.unwrap_or(0);
    let limit = query
        .limit
        .map(|l| l.clamp(1, MAX_LIMIT))
        .unwrap_or(DEFAULT_LIMIT);

    let list = table.list(ListOptions::new().order_by(quote_ident(table.def().id_field())));
    let total = list.count().await?;
    let rows = list.query_by_page(offset, limit).await?;

    Ok(PageResponse {
        rows,
        total,
        offset,
        limit,
    })
}

/// Insert a row, returning its generated id.
pub async fn handle_create(table: &Table, fields: FieldMap) -> Result<CreatedResponse> {
    let id = table.insert(&fields).await?;
    tracing::debug!(table = table.def().table(), %id, "row created");
    Ok(CreatedResponse { id })
}

/// Update the row at `id`; the path id wins over any id in the body.
pub async fn handle_update(table: &Table, id: &str, mut fields: FieldMap) -> Result<()> {
    if id.is_empty() {
        return Err(AppError::BadRequest("empty row id".to_string()));
    }
    fields.insert(table.def().id_field().to_string(), Value::from(id));
    table.update(&fields).await?;
    Ok(())
}

/// Delete the row at `id`.
pub async fn handle_delete(table: &Table, id: &str) -> Result<()> {
    table.delete(id).await?;
    Ok(())
}
