//! List options and the statement renderer.
//!
//! [`ListOptions`] is built once with consuming setters and then treated as
//! immutable. [`render`] is a pure function of the entity definition, the
//! options and the render [`Mode`], so rendering the same options twice always
//! yields the same statement and argument order.

use crate::entity::{normalize_fields, quote_ident, EntityDef};
use crate::error::{Error, Result};
use crate::Version;
use serde_json::Value;

/// A rendered SQL statement with its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// How a listing is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Active rows with the requested projection.
    Plain,
    /// `COUNT(*)` over active rows.
    Count,
    /// Active rows limited to `num` rows starting at offset `start`.
    Page { start: u64, num: u64 },
    /// Rows with `after < version <= through`, tombstones included.
    Version { after: Version, through: Version },
}

#[derive(Debug, Clone, PartialEq)]
struct Join {
    table: String,
    on: String,
    args: Vec<Value>,
}

/// Filter, join, ordering and projection state for one listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    raw: Option<Statement>,
    fields: Option<String>,
    joins: Vec<Join>,
    filter: Option<String>,
    filter_args: Vec<Value>,
    order_by: Option<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `sql` verbatim, ignoring every other option.
    ///
    /// Version reads drop the first `` `deleted`=0 AND `` guard from `sql` so
    /// that tombstones come through.
    pub fn raw(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            raw: Some(Statement::new(sql, args)),
            ..Self::default()
        }
    }

    /// Override the entity's default projection.
    pub fn fields(mut self, fields: &str) -> Self {
        self.fields = Some(normalize_fields(fields));
        self
    }

    /// Set the filter clause. Replaces any previous filter and its arguments.
    pub fn filter(mut self, clause: impl Into<String>, args: Vec<Value>) -> Self {
        self.filter = Some(clause.into());
        self.filter_args = args;
        self
    }

    /// Set the ordering expression (used verbatim).
    pub fn order_by(mut self, expr: impl Into<String>) -> Self {
        self.order_by = Some(expr.into());
        self
    }

    /// Append a `LEFT JOIN`. Join arguments bind before filter arguments.
    pub fn left_join(
        mut self,
        table: impl Into<String>,
        on: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        self.joins.push(Join {
            table: table.into(),
            on: on.into(),
            args,
        });
        self
    }

    pub fn is_raw(&self) -> bool {
        self.raw.is_some()
    }
}

/// Render `options` against `def` in the given mode.
///
/// Fails only for [`Mode::Version`] on a table without versioning.
pub fn render(def: &EntityDef, options: &ListOptions, mode: Mode) -> Result<Statement> {
    if matches!(mode, Mode::Version { .. }) && !def.versioned() {
        return Err(Error::VersioningDisabled(def.table().to_string()));
    }

    if let Some(raw) = &options.raw {
        return Ok(render_raw(def, raw, mode));
    }

    let table = quote_ident(def.table());
    let column = |name: &str| format!("{}.{}", table, quote_ident(name));

    let mut fields = match mode {
        Mode::Count => "COUNT(*)".to_string(),
        _ => options
            .fields
            .clone()
            .unwrap_or_else(|| def.default_fields().to_string()),
    };

    // Version reads must surface tombstones, so the flag is always projected.
    if let Mode::Version { .. } = mode {
        if def.soft_delete()
            && fields != "*"
            && !fields.contains(&quote_ident(def.deleted_field()))
        {
            fields.push_str(", ");
            fields.push_str(&column(def.deleted_field()));
        }
    }

    let mut sql = format!("SELECT {} FROM {}", fields, table);
    let mut args = Vec::new();

    for join in &options.joins {
        sql.push_str(&format!(" LEFT JOIN {} ON {}", join.table, join.on));
        args.extend(join.args.iter().cloned());
    }

    let mut conditions = Vec::new();
    if !matches!(mode, Mode::Version { .. }) && def.soft_delete() {
        conditions.push(format!("{}=0", column(def.deleted_field())));
    }
    if let Some(filter) = &options.filter {
        conditions.push(format!("({})", filter));
        args.extend(options.filter_args.iter().cloned());
    }
    if let Mode::Version { after, through } = mode {
        conditions.push(format!("{} BETWEEN ? AND ?", column(def.version_field())));
        args.push(Value::from(after + 1));
        args.push(Value::from(through));
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    if let Some(order_by) = &options.order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }

    if let Mode::Page { start, num } = mode {
        sql.push_str(" LIMIT ?,?");
        args.push(Value::from(start));
        args.push(Value::from(num));
    }

    Ok(Statement { sql, args })
}

fn render_raw(def: &EntityDef, raw: &Statement, mode: Mode) -> Statement {
    let mut statement = raw.clone();
    match mode {
        Mode::Plain | Mode::Count => {}
        Mode::Page { start, num } => {
            statement.sql.push_str(" LIMIT ?,?");
            statement.args.push(Value::from(start));
            statement.args.push(Value::from(num));
        }
        Mode::Version { after, through } => {
            if def.soft_delete() {
                let guard = format!("{}=0 AND ", quote_ident(def.deleted_field()));
                statement.sql = statement.sql.replacen(&guard, "", 1);
            }
            statement.sql.push_str(&format!(
                " AND {} BETWEEN ? AND ?",
                quote_ident(def.version_field())
            ));
            statement.args.push(Value::from(after + 1));
            statement.args.push(Value::from(through));
        }
    }
    statement
}
