//! Configuration management for the server.

use std::env;
use std::time::Duration;
use tidemark_engine::{EntityDef, DEFAULT_ID_ATTEMPTS};

/// Fixed-window limit: at most `times` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    pub window: Duration,
    pub times: u32,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            times: 10_000,
        }
    }
}

/// One table exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub versioned: bool,
    pub fields: String,
}

impl TableSpec {
    pub fn entity(&self) -> EntityDef {
        if self.versioned {
            EntityDef::with_version(self.name.as_str(), &self.fields)
        } else {
            EntityDef::new(self.name.as_str(), &self.fields)
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// MySQL connection URL
    pub database_url: String,
    /// Redis URL for the version counters
    pub redis_url: String,
    pub db_max_connections: u32,
    pub query_limit: LimitConfig,
    pub update_limit: LimitConfig,
    /// Cap on primary key generation attempts per insert
    pub id_max_attempts: usize,
    pub tables: Vec<TableSpec>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;

        let redis_url =
            lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());

        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?;

        let defaults = LimitConfig::default();
        let query_limit = LimitConfig {
            window: Duration::from_secs(parse_or(
                &lookup,
                "QUERY_LIMIT_WINDOW_SECS",
                defaults.window.as_secs(),
            )?),
            times: parse_or(&lookup, "QUERY_LIMIT_TIMES", defaults.times)?,
        };
        let update_limit = LimitConfig {
            window: Duration::from_secs(parse_or(
                &lookup,
                "UPDATE_LIMIT_WINDOW_SECS",
                defaults.window.as_secs(),
            )?),
            times: parse_or(&lookup, "UPDATE_LIMIT_TIMES", defaults.times)?,
        };

        let id_max_attempts = parse_or(&lookup, "ID_MAX_ATTEMPTS", DEFAULT_ID_ATTEMPTS)?;

        let tables = match lookup("TIDEMARK_TABLES") {
            Some(raw) => parse_tables(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            host,
            port,
            database_url,
            redis_url,
            db_max_connections,
            query_limit,
            update_limit,
            id_max_attempts,
            tables,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.clone(),
        }),
        None => Ok(default),
    }
}

/// Parse `name[+v]:field,field;...` into table specs.
pub fn parse_tables(raw: &str) -> Result<Vec<TableSpec>, ConfigError> {
    let mut tables = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (head, fields) = entry.split_once(':').unwrap_or((entry, ""));
        let head = head.trim();
        let (name, versioned) = match head.strip_suffix("+v") {
            Some(name) => (name, true),
            None => (head, false),
        };

        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ConfigError::InvalidTables(entry.to_string()));
        }
        if tables.iter().any(|t: &TableSpec| t.name == name) {
            return Err(ConfigError::InvalidTables(format!("duplicate table {}", name)));
        }

        tables.push(TableSpec {
            name: name.to_string(),
            versioned,
            fields: fields.trim().to_string(),
        });
    }
    Ok(tables)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid {name} value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("Invalid TIDEMARK_TABLES entry: {0}")]
    InvalidTables(String),
}
