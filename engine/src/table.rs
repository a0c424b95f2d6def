//! Point CRUD for one table.

use crate::context::Context;
use crate::entity::{quote_ident, EntityDef};
use crate::error::{Error, Result};
use crate::list::List;
use crate::query::ListOptions;
use crate::record::{key_string, FieldMap, Record};
use crate::version::VersionCounter;
use crate::Version;
use serde_json::Value;
use std::sync::Arc;

/// Record accessor bound to one [`EntityDef`].
///
/// Reads never see soft-deleted rows. When the table is versioned every
/// mutation, deletes included, stamps a fresh version so that it shows up in
/// version-range reads.
#[derive(Debug, Clone)]
pub struct Table {
    ctx: Context,
    def: Arc<EntityDef>,
}

impl Table {
    pub fn new(ctx: Context, def: Arc<EntityDef>) -> Self {
        Self { ctx, def }
    }

    pub fn def(&self) -> &EntityDef {
        &self.def
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Version counter for this table.
    pub fn versions(&self) -> VersionCounter<'_> {
        VersionCounter::new(&self.ctx, &self.def)
    }

    /// The table's current watermark.
    pub async fn watermark(&self) -> Result<Version> {
        self.versions().current().await
    }

    /// Start a listing over this table.
    pub fn list(&self, options: ListOptions) -> List<'_> {
        List::new(self, options)
    }

    /// Fetch an active row by primary key.
    #[tracing::instrument(skip(self), fields(table = %self.def.table()))]
    pub async fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            self.def.default_fields(),
            quote_ident(self.def.table()),
            self.by_id_filter()
        );
        let rows = self.ctx.executor().query(&sql, &[Value::from(id)]).await?;
        rows.into_iter().next().map(T::from_fields).transpose()
    }

    /// Insert a record under a freshly generated primary key and return it.
    #[tracing::instrument(skip_all, fields(table = %self.def.table()))]
    pub async fn insert<T: Record>(&self, record: &T) -> Result<String> {
        let mut fields = record.to_fields()?;
        let id = self.unique_id().await?;

        fields.insert(self.def.id_field().to_string(), Value::from(id.clone()));
        if self.def.soft_delete() {
            fields.insert(self.def.deleted_field().to_string(), Value::from(0));
        }
        if self.def.versioned() {
            let version = self.versions().next_version().await?;
            fields.insert(self.def.version_field().to_string(), Value::from(version));
        }

        self.ctx.executor().insert(self.def.table(), &fields).await?;
        tracing::debug!(%id, "inserted row");
        Ok(id)
    }

    /// Update the active row whose primary key is carried by `record`.
    ///
    /// Matching no row is not an error.
    #[tracing::instrument(skip_all, fields(table = %self.def.table()))]
    pub async fn update<T: Record>(&self, record: &T) -> Result<()> {
        let mut fields = record.to_fields()?;
        let id = fields
            .remove(self.def.id_field())
            .as_ref()
            .and_then(key_string)
            .ok_or_else(|| Error::MissingId(self.def.id_field().to_string()))?;

        self.apply_update(fields, self.by_id_filter(), vec![Value::from(id)])
            .await
    }

    /// Update every active row matching `filter` with the fields of `record`.
    ///
    /// The primary-key field of `record` is never written.
    #[tracing::instrument(skip(self, record, args), fields(table = %self.def.table()))]
    pub async fn update_by<T: Record>(
        &self,
        record: &T,
        filter: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        let mut fields = record.to_fields()?;
        fields.remove(self.def.id_field());

        let filter = match self.def.active_condition() {
            Some(active) => format!("{} AND ({})", active, filter),
            None => filter.to_string(),
        };
        self.apply_update(fields, filter, args).await
    }

    /// Delete a row by primary key.
    ///
    /// With soft delete enabled this flags the row (and stamps a version);
    /// otherwise the row is removed.
    #[tracing::instrument(skip(self), fields(table = %self.def.table()))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.def.soft_delete() {
            let mut fields = FieldMap::new();
            fields.insert(self.def.deleted_field().to_string(), Value::from(1));
            return self
                .apply_update(fields, self.by_id_filter(), vec![Value::from(id)])
                .await;
        }

        let sql = format!(
            "DELETE FROM {} WHERE {}",
            quote_ident(self.def.table()),
            self.by_id_filter()
        );
        self.ctx.executor().exec(&sql, &[Value::from(id)]).await?;
        Ok(())
    }

    async fn apply_update(&self, mut fields: FieldMap, filter: String, args: Vec<Value>) -> Result<()> {
        if self.def.versioned() {
            let version = self.versions().next_version().await?;
            fields.insert(self.def.version_field().to_string(), Value::from(version));
        }

        if fields.is_empty() {
            tracing::debug!("nothing to update");
            return Ok(());
        }

        let affected = self
            .ctx
            .executor()
            .update(self.def.table(), &fields, &filter, &args)
            .await?;
        tracing::debug!(affected, "updated rows");
        Ok(())
    }

    async fn unique_id(&self) -> Result<String> {
        let sql = format!(
            "SELECT {id} FROM {table} WHERE {id}=? LIMIT 1",
            id = quote_ident(self.def.id_field()),
            table = quote_ident(self.def.table())
        );

        let attempts = self.ctx.id_attempts();
        for _ in 0..attempts {
            let candidate = self.ctx.ids().next_id();
            if candidate.is_empty() {
                continue;
            }
            let taken = self
                .ctx
                .executor()
                .query(&sql, &[Value::from(candidate.as_str())])
                .await?;
            if taken.is_empty() {
                return Ok(candidate);
            }
        }

        tracing::error!(attempts, "failed to create unique id");
        Err(Error::IdExhausted {
            table: self.def.table().to_string(),
            attempts,
        })
    }

    fn by_id_filter(&self) -> String {
        let id = format!("{}=?", quote_ident(self.def.id_field()));
        match self.def.active_condition() {
            Some(active) => format!("{} AND {}", active, id),
            None => id,
        }
    }
}
