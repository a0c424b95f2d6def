//! Table endpoint routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tidemark_engine::FieldMap;

use crate::auth::Caller;
use crate::error::Result;
use crate::handlers::{
    handle_changes, handle_create, handle_delete, handle_get, handle_page, handle_update,
    ChangesQuery, ChangesResponse, CreatedResponse, PageQuery, PageResponse,
};
use crate::AppState;

/// Create table routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tables/{table}/rows", get(page_handler).post(create_handler))
        .route(
            "/tables/{table}/rows/{id}",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .route("/tables/{table}/changes", get(changes_handler))
}

/// GET /tables/{table}/rows/{id} - Fetch one row.
async fn get_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<FieldMap>> {
    state.admit_read(&caller)?;
    let table = state.table(&table)?;
    Ok(Json(handle_get(&table, &id).await?))
}

/// GET /tables/{table}/rows - Fetch a page of rows.
async fn page_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(table): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse>> {
    state.admit_read(&caller)?;
    let table = state.table(&table)?;
    Ok(Json(handle_page(&table, query).await?))
}

/// POST /tables/{table}/rows - Insert a row.
async fn create_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(table): Path<String>,
    Json(fields): Json<FieldMap>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    state.admit_write(&caller)?;
    let table = state.table(&table)?;
    let created = handle_create(&table, fields).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /tables/{table}/rows/{id} - Update a row.
async fn update_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path((table, id)): Path<(String, String)>,
    Json(fields): Json<FieldMap>,
) -> Result<StatusCode> {
    state.admit_write(&caller)?;
    let table = state.table(&table)?;
    handle_update(&table, &id, fields).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /tables/{table}/rows/{id} - Delete a row.
async fn delete_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path((table, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    state.admit_write(&caller)?;
    let table = state.table(&table)?;
    handle_delete(&table, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /tables/{table}/changes - Pull rows changed since a version.
async fn changes_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(table): Path<String>,
    Query(query): Query<ChangesQuery>,
) -> Result<Json<ChangesResponse>> {
    state.admit_read(&caller)?;
    let table = state.table(&table)?;
    Ok(Json(handle_changes(&table, query).await?))
}
