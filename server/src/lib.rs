//! Tidemark Server - HTTP access to versioned tables.
//!
//! Serves the tables named in the configuration over a small REST surface:
//! point CRUD, pages, and version-range pulls for incremental sync. Rows
//! live in MySQL, version counters in Redis.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod routes;

use crate::auth::Caller;
use crate::cache::RedisCounter;
use crate::config::Config;
use crate::db::MySqlExecutor;
use crate::error::AppError;
use crate::limiter::RateLimiter;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tidemark_engine::{Context, EntityDef, Table};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub context: Context,
    /// Registered tables by name
    pub tables: Arc<HashMap<String, Arc<EntityDef>>>,
    pub query_limiter: Arc<RateLimiter>,
    pub update_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build state for the tables and limits in `config`.
    pub fn new(context: Context, config: &Config) -> Self {
        let tables = config
            .tables
            .iter()
            .map(|spec| (spec.name.clone(), Arc::new(spec.entity())))
            .collect();

        Self {
            context,
            tables: Arc::new(tables),
            query_limiter: Arc::new(RateLimiter::new("query", config.query_limit)),
            update_limiter: Arc::new(RateLimiter::new("update", config.update_limit)),
        }
    }

    /// Accessor for a registered table.
    pub fn table(&self, name: &str) -> Result<Table, AppError> {
        self.tables
            .get(name)
            .map(|def| self.context.table(def))
            .ok_or_else(|| AppError::NotFound(format!("table {}", name)))
    }

    /// Count a read against the caller's query limit.
    pub fn admit_read(&self, caller: &Caller) -> Result<(), AppError> {
        admit(&self.query_limiter, caller)
    }

    /// Count a write against the caller's update limit.
    pub fn admit_write(&self, caller: &Caller) -> Result<(), AppError> {
        admit(&self.update_limiter, caller)
    }
}

fn admit(limiter: &RateLimiter, caller: &Caller) -> Result<(), AppError> {
    if limiter.check(&caller.key) {
        Ok(())
    } else {
        tracing::warn!(limiter = limiter.name(), caller = %caller.key, "request rejected");
        Err(AppError::TooManyRequests)
    }
}

/// Connect to MySQL and Redis and build the application state.
pub async fn bootstrap(config: &Config) -> Result<AppState, AppError> {
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Connected to MySQL");

    let counters = RedisCounter::connect(&config.redis_url).await?;
    tracing::info!("Connected to Redis at {}", config.redis_url);

    let context = Context::new(Arc::new(MySqlExecutor::new(pool)), Arc::new(counters))
        .with_id_attempts(config.id_max_attempts);

    let state = AppState::new(context, config);
    for (name, def) in state.tables.iter() {
        tracing::info!(table = %name, versioned = def.versioned(), "serving table");
    }
    Ok(state)
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
