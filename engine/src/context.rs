//! The explicit handle carrying the engine's collaborators.

use crate::backend::{CounterCache, Executor, IdMaker};
use crate::entity::EntityDef;
use crate::id::ShortId;
use crate::table::Table;
use std::fmt;
use std::sync::Arc;

/// Default cap on id generation attempts per insert.
pub const DEFAULT_ID_ATTEMPTS: usize = 10_000;

/// Collaborators shared by every accessor.
///
/// Constructed once by the host and cloned into each accessor; clones share
/// the same executor, cache and id maker.
#[derive(Clone)]
pub struct Context {
    executor: Arc<dyn Executor>,
    cache: Arc<dyn CounterCache>,
    ids: Arc<dyn IdMaker>,
    id_attempts: usize,
}

impl Context {
    /// Create a context using [`ShortId`] for primary keys.
    pub fn new(executor: Arc<dyn Executor>, cache: Arc<dyn CounterCache>) -> Self {
        Self {
            executor,
            cache,
            ids: Arc::new(ShortId::default()),
            id_attempts: DEFAULT_ID_ATTEMPTS,
        }
    }

    /// Replace the id maker.
    pub fn with_id_maker(mut self, ids: Arc<dyn IdMaker>) -> Self {
        self.ids = ids;
        self
    }

    /// Change the id generation attempt cap (at least one attempt is made).
    pub fn with_id_attempts(mut self, attempts: usize) -> Self {
        self.id_attempts = attempts.max(1);
        self
    }

    /// Bind an accessor for `def`.
    pub fn table(&self, def: &Arc<EntityDef>) -> Table {
        Table::new(self.clone(), Arc::clone(def))
    }

    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    pub fn cache(&self) -> &dyn CounterCache {
        self.cache.as_ref()
    }

    pub fn ids(&self) -> &dyn IdMaker {
        self.ids.as_ref()
    }

    pub fn id_attempts(&self) -> usize {
        self.id_attempts
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id_attempts", &self.id_attempts)
            .finish_non_exhaustive()
    }
}
