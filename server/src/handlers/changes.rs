//! Changes handler - serves version-range pulls to downstream consumers.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tidemark_engine::{FieldMap, ListOptions, Table, Version};

/// Query parameters for a changes pull.
#[derive(Debug, Default, Deserialize)]
pub struct ChangesQuery {
    /// Last version the consumer has seen (0 for a full pull)
    pub since: Option<Version>,
    /// Upper bound of the pull (0 or absent for the current watermark)
    pub until: Option<Version>,
}

/// Response for a changes pull.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesResponse {
    /// Changed rows keyed by primary key, soft-deleted ones included
    pub rows: HashMap<String, FieldMap>,
    /// Cursor to send as `since` on the next pull
    pub version: Version,
    pub has_changes: bool,
}

/// Pull every row changed after `since`.
pub async fn handle_changes(table: &Table, query: ChangesQuery) -> Result<ChangesResponse> {
    let since = query.since.unwrap_or(0);
    let until = query.until.unwrap_or(0);

    let mut rows = HashMap::new();
    let version = table
        .list(ListOptions::new())
        .try_query_by_version(&mut rows, since, until)
        .await?;

    Ok(ChangesResponse {
        has_changes: version > since,
        rows,
        version,
    })
}
