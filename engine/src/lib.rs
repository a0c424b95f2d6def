//! # Tidemark Engine
//!
//! A versioned record store core for relational tables.
//!
//! Tables managed by the engine get soft deletes, per-row version stamps and
//! incremental synchronization: a downstream consumer can repeatedly ask for
//! everything that changed since the last version it saw and receive a
//! monotonically advancing cursor.
//!
//! ## Design Principles
//!
//! - **No drivers**: The engine talks to the database, the counter cache and
//!   the id source only through the traits in [`backend`]
//! - **Value-encoded failure**: Nothing panics across the API; every failure
//!   is a [`Result`] or, for sync pulls, an unchanged cursor
//! - **Pure rendering**: [`render`] turns an [`EntityDef`] and [`ListOptions`]
//!   into SQL without touching any state
//!
//! ## Core Concepts
//!
//! ### Entity definitions
//!
//! An [`EntityDef`] names a table's primary key, soft-delete flag, optional
//! version column and default projection. Definitions are built once and
//! shared read-only.
//!
//! ### Version stamps
//!
//! The [`VersionCounter`] issues strictly increasing stamps per table from a
//! shared counter (key `_DATA_VERSION_<table>`), recovering from the table's
//! own `MAX(version)` when the counter is cold.
//!
//! ### Accessors and listings
//!
//! A [`Table`] performs point CRUD; every mutation of a versioned table, deletes
//! included, takes a fresh stamp. [`Table::list`] returns a [`List`] for plain
//! listings, counts, pages and version-range pulls.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tidemark_engine::{EntityDef, ListOptions, Mode, render};
//! use serde_json::json;
//!
//! let users = Arc::new(EntityDef::with_version("users", "id,name"));
//! let options = ListOptions::new().filter("`name`=?", vec![json!("Alice")]);
//!
//! let stmt = render(&users, &options, Mode::Version { after: 4, through: 9 }).unwrap();
//! assert_eq!(
//!     stmt.sql,
//!     "SELECT `id`,`name`, `users`.`deleted` FROM `users` \
//!      WHERE (`name`=?) AND `users`.`version` BETWEEN ? AND ?"
//! );
//! assert_eq!(stmt.args, vec![json!("Alice"), json!(5), json!(9)]);
//! ```
//!
//! With a [`Context`] wrapping real collaborators:
//!
//! ```rust,ignore
//! let ctx = Context::new(executor, cache);
//! let users = ctx.table(&users_def);
//!
//! let id = users.insert(&User { name: "Alice".into(), ..Default::default() }).await?;
//! let mut changed: Vec<User> = Vec::new();
//! let cursor = users.list(ListOptions::new()).query_by_version(&mut changed, cursor, 0).await;
//! ```

pub mod backend;
pub mod context;
pub mod entity;
pub mod error;
pub mod id;
pub mod list;
pub mod memory;
pub mod query;
pub mod record;
pub mod sync;
pub mod table;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod version;

// Re-export main types at crate root
pub use backend::{query_scalar, CounterCache, Executor, IdMaker};
pub use context::{Context, DEFAULT_ID_ATTEMPTS};
pub use entity::{normalize_fields, quote_ident, EntityBuilder, EntityDef, VERSION_KEY_PREFIX};
pub use error::{Error, Result};
pub use id::ShortId;
pub use list::List;
pub use memory::MemoryCounter;
pub use query::{render, ListOptions, Mode, Statement};
pub use record::{key_string, FieldMap, Record};
pub use sync::SyncTarget;
pub use table::Table;
pub use version::VersionCounter;

/// Version stamp / watermark.
pub type Version = u64;
