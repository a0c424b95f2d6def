//! Terminal operations over a rendered listing.

use crate::backend::query_scalar;
use crate::error::Result;
use crate::query::{render, ListOptions, Mode, Statement};
use crate::record::{value_as_u64, Record};
use crate::table::Table;

/// A listing over one table, created by [`Table::list`].
#[derive(Debug, Clone)]
pub struct List<'a> {
    pub(crate) table: &'a Table,
    pub(crate) options: ListOptions,
}

impl<'a> List<'a> {
    pub(crate) fn new(table: &'a Table, options: ListOptions) -> Self {
        Self { table, options }
    }

    pub fn options(&self) -> &ListOptions {
        &self.options
    }

    /// Render this listing in `mode` without running it.
    pub fn statement(&self, mode: Mode) -> Result<Statement> {
        render(self.table.def(), &self.options, mode)
    }

    /// Fetch every matching active row.
    #[tracing::instrument(skip(self), fields(table = %self.table.def().table()))]
    pub async fn query_all<T: Record>(&self) -> Result<Vec<T>> {
        self.fetch(Mode::Plain).await
    }

    /// Count matching active rows.
    #[tracing::instrument(skip(self), fields(table = %self.table.def().table()))]
    pub async fn count(&self) -> Result<u64> {
        let stmt = self.statement(Mode::Count)?;
        let value = query_scalar(self.table.context().executor(), &stmt.sql, &stmt.args).await?;
        Ok(value_as_u64(&value).unwrap_or(0))
    }

    /// Fetch `num` matching active rows starting at offset `start`.
    #[tracing::instrument(skip(self), fields(table = %self.table.def().table()))]
    pub async fn query_by_page<T: Record>(&self, start: u64, num: u64) -> Result<Vec<T>> {
        self.fetch(Mode::Page { start, num }).await
    }

    async fn fetch<T: Record>(&self, mode: Mode) -> Result<Vec<T>> {
        let stmt = self.statement(mode)?;
        tracing::debug!(sql = %stmt.sql, "listing");
        self.table
            .context()
            .executor()
            .query(&stmt.sql, &stmt.args)
            .await?
            .into_iter()
            .map(T::from_fields)
            .collect()
    }
}
