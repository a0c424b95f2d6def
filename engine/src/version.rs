//! Per-table version counters.
//!
//! The shared counter cache is the fast path. The table's own version column
//! is the durable source of truth and is consulted whenever the counter is
//! missing, reset or unreachable.
//!
//! Cold start is racy by nature: two callers that both see an empty counter
//! each compute `MAX(version) + 1` and write it back. Both get the same
//! stamp unless a row is written between their two `MAX` reads. Once the
//! counter is warm every stamp comes from a single atomic increment.

use crate::backend::query_scalar;
use crate::context::Context;
use crate::entity::EntityDef;
use crate::error::{Error, Result};
use crate::record::value_as_u64;
use crate::Version;

/// Issues and reads version stamps for one table.
#[derive(Debug, Clone, Copy)]
pub struct VersionCounter<'a> {
    ctx: &'a Context,
    def: &'a EntityDef,
}

impl<'a> VersionCounter<'a> {
    pub fn new(ctx: &'a Context, def: &'a EntityDef) -> Self {
        Self { ctx, def }
    }

    /// Issue the next version stamp for the table.
    ///
    /// Only fails when the counter is cold and the relational fallback fails
    /// as well.
    pub async fn next_version(&self) -> Result<Version> {
        self.ensure_versioned()?;
        let key = self.def.version_key();

        match self.ctx.cache().incr(&key).await {
            Ok(version) if version > 1 => {
                tracing::debug!(table = self.def.table(), version, "issued version stamp");
                return Ok(version as Version);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(table = self.def.table(), error = %e, "counter increment failed, using stored maximum");
            }
        }

        let next = self.stored_max().await? + 1;
        if let Err(e) = self.ctx.cache().set(&key, next).await {
            tracing::warn!(table = self.def.table(), error = %e, "failed to reseed version counter");
        }
        tracing::debug!(table = self.def.table(), version = next, "reseeded version counter");
        Ok(next)
    }

    /// Read the table's current watermark without issuing a stamp.
    ///
    /// An empty or unreachable counter falls back to the stored maximum. The
    /// fallback value is not written back.
    pub async fn current(&self) -> Result<Version> {
        self.ensure_versioned()?;

        match self.ctx.cache().get(&self.def.version_key()).await {
            Ok(Some(version)) if version > 0 => return Ok(version),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(table = self.def.table(), error = %e, "counter read failed, using stored maximum");
            }
        }

        self.stored_max().await
    }

    /// Highest version recorded in the table (0 for an empty table).
    pub async fn stored_max(&self) -> Result<Version> {
        let value = query_scalar(self.ctx.executor(), &self.def.max_version_sql(), &[]).await?;
        Ok(value_as_u64(&value).unwrap_or(0))
    }

    fn ensure_versioned(&self) -> Result<()> {
        if self.def.versioned() {
            Ok(())
        } else {
            Err(Error::VersioningDisabled(self.def.table().to_string()))
        }
    }
}
