//! Incremental sync: version-range pulls and watermark bookkeeping.
//!
//! A consumer keeps a cursor (the last watermark it received) and repeatedly
//! asks for everything in `(cursor, watermark]`. The returned watermark is
//! either the unchanged cursor (nothing new, or the pull failed) or the
//! resolved ceiling of a fully retrieved batch. It never lands in between and
//! never goes below the cursor that was passed in.

use crate::error::{Error, Result};
use crate::list::List;
use crate::query::Mode;
use crate::record::{key_string, FieldMap, Record};
use crate::Version;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// A container version-range rows can be merged into.
///
/// Sequences append rows in result order. Maps are keyed by primary-key
/// value, so a later pull of the same row replaces the earlier copy.
/// Implementations must leave the container untouched when merging fails.
pub trait SyncTarget {
    fn merge_rows(&mut self, rows: Vec<FieldMap>, id_field: &str) -> Result<()>;
}

impl<T: Record> SyncTarget for Vec<T> {
    fn merge_rows(&mut self, rows: Vec<FieldMap>, _id_field: &str) -> Result<()> {
        let decoded = rows
            .into_iter()
            .map(T::from_fields)
            .collect::<Result<Vec<T>>>()?;
        self.extend(decoded);
        Ok(())
    }
}

impl<T: Record, S: BuildHasher> SyncTarget for HashMap<String, T, S> {
    fn merge_rows(&mut self, rows: Vec<FieldMap>, id_field: &str) -> Result<()> {
        let keyed = keyed_rows(rows, id_field)?;
        self.extend(keyed);
        Ok(())
    }
}

impl<T: Record> SyncTarget for BTreeMap<String, T> {
    fn merge_rows(&mut self, rows: Vec<FieldMap>, id_field: &str) -> Result<()> {
        let keyed = keyed_rows(rows, id_field)?;
        self.extend(keyed);
        Ok(())
    }
}

fn keyed_rows<T: Record>(rows: Vec<FieldMap>, id_field: &str) -> Result<Vec<(String, T)>> {
    rows.into_iter()
        .map(|row| {
            let key = row
                .get(id_field)
                .and_then(key_string)
                .ok_or_else(|| Error::MissingId(id_field.to_string()))?;
            Ok((key, T::from_fields(row)?))
        })
        .collect()
}

impl<'a> List<'a> {
    /// Pull every row changed in `(min_version, max_version]` into `out`.
    ///
    /// A `max_version` of 0 means "up to the table's current watermark".
    /// Returns the new cursor: `max_version` once the batch has been merged,
    /// or `min_version` when there is nothing new or the pull failed. Failures
    /// are logged; use [`List::try_query_by_version`] to inspect them.
    pub async fn query_by_version<C: SyncTarget>(
        &self,
        out: &mut C,
        min_version: Version,
        max_version: Version,
    ) -> Version {
        match self.try_query_by_version(out, min_version, max_version).await {
            Ok(watermark) => watermark,
            Err(e) => {
                tracing::warn!(
                    table = self.table.def().table(),
                    min_version,
                    error = %e,
                    "version pull failed, cursor unchanged"
                );
                min_version
            }
        }
    }

    /// [`List::query_by_version`], reporting failures instead of absorbing them.
    #[tracing::instrument(skip(self, out), fields(table = %self.table.def().table()))]
    pub async fn try_query_by_version<C: SyncTarget>(
        &self,
        out: &mut C,
        min_version: Version,
        max_version: Version,
    ) -> Result<Version> {
        let def = self.table.def();
        if !def.versioned() {
            return Err(Error::VersioningDisabled(def.table().to_string()));
        }

        let max_version = if max_version == 0 {
            self.table.watermark().await?
        } else {
            max_version
        };

        if min_version >= max_version {
            tracing::debug!(min_version, max_version, "no new versions");
            return Ok(min_version);
        }

        let stmt = self.statement(Mode::Version {
            after: min_version,
            through: max_version,
        })?;
        let rows = self
            .table
            .context()
            .executor()
            .query(&stmt.sql, &stmt.args)
            .await?;
        let pulled = rows.len();
        out.merge_rows(rows, def.id_field())?;

        tracing::debug!(min_version, max_version, pulled, "pulled version range");
        Ok(max_version)
    }
}
