//! Configuration handling for the multi-database MCP server.
//!
//! Database definitions arrive as JSON, either a `DB_CONFIGS` array
//! describing several databases or a single `DB_TYPE`/`DB_CONFIG` pair.
//! CLI flags and environment variables are interchangeable; flags win.

use clap::{Parser, ValueEnum};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_DB_TYPE: &str = "pg";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// One validated database definition, ready for runner construction.
#[derive(Debug, Clone)]
pub struct DatabaseSpec {
    /// Unique identifier, caller-supplied or derived.
    pub id: String,
    /// Engine tag exactly as configured (shown in listings).
    pub db_type: String,
    /// Parsed engine, used to construct the runner.
    pub engine: DatabaseType,
    /// Connection parameters, passed verbatim to the runner.
    pub configuration: Map<String, Value>,
    /// Human-readable label.
    pub description: String,
}

/// Derive a stable identifier for a database that was configured without one.
///
/// Built from the first two characters of the engine tag, the first eight
/// alphanumeric characters of the description, and the zero-based position:
/// `("pg", "PostgreSQL DB", 0)` becomes `pg_postgres_0`.
pub fn derive_id(db_type: &str, description: &str, index: usize) -> String {
    let type_part: String = db_type.chars().take(2).flat_map(char::to_lowercase).collect();
    let desc_part: String = description
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(8)
        .flat_map(char::to_lowercase)
        .collect();
    format!("{type_part}_{desc_part}_{index}")
}

/// Where the database definitions came from, in resolution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--db-configs` / `DB_CONFIGS`: a JSON array of definitions.
    Multi(String),
    /// `--db-type` + `--db-config` / `DB_TYPE` + `DB_CONFIG`.
    Single { db_type: String, payload: String },
}

/// Configuration for the multi-database MCP server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "multidb-mcp-server",
    about = "MCP server exposing multiple SQL databases to AI assistants",
    version,
    author
)]
pub struct Config {
    /// JSON array of database definitions.
    /// Each element: {"db_type": ..., "configuration": {...}, "description": ..., "id"?: ...}
    #[arg(long = "db-configs", value_name = "JSON", env = "DB_CONFIGS")]
    pub db_configs: Option<String>,

    /// Engine tag for the single-database form (pg, mysql, sqlite)
    #[arg(long = "db-type", value_name = "TYPE", env = "DB_TYPE")]
    pub db_type: Option<String>,

    /// JSON connection object for the single-database form
    #[arg(long = "db-config", value_name = "JSON", env = "DB_CONFIG")]
    pub db_config: Option<String>,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            db_configs: None,
            db_type: None,
            db_config: None,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Resolve which configuration source applies. The multi-database form
    /// takes precedence; the single form falls back to `pg` when only the
    /// connection object was given.
    pub fn source(&self) -> DbResult<ConfigSource> {
        if let Some(raw) = non_empty(self.db_configs.as_deref()) {
            return Ok(ConfigSource::Multi(raw.to_string()));
        }
        if let Some(payload) = non_empty(self.db_config.as_deref()) {
            let db_type = non_empty(self.db_type.as_deref()).unwrap_or(DEFAULT_DB_TYPE);
            return Ok(ConfigSource::Single {
                db_type: db_type.to_string(),
                payload: payload.to_string(),
            });
        }
        Err(DbError::config(
            "Database type and configuration are required",
        ))
    }

    /// Parse all database definitions from the resolved source.
    pub fn database_specs(&self) -> DbResult<Vec<DatabaseSpec>> {
        match self.source()? {
            ConfigSource::Multi(raw) => parse_multi(&raw),
            ConfigSource::Single { db_type, payload } => parse_single(&db_type, &payload),
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse the `DB_CONFIGS` JSON array into database specs.
fn parse_multi(raw: &str) -> DbResult<Vec<DatabaseSpec>> {
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|e| DbError::config(format!("Error parsing DB_CONFIGS: {e}")))?;
    let entries = parsed
        .as_array()
        .filter(|list| !list.is_empty())
        .ok_or_else(|| DbError::config("DB_CONFIGS must be a non-empty JSON array"))?;

    let mut specs = Vec::with_capacity(entries.len());
    let mut seen_ids = HashSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let spec = parse_entry(entry, index)?;
        if !seen_ids.insert(spec.id.clone()) {
            return Err(DbError::config(format!(
                "Duplicate database ID: {}",
                spec.id
            )));
        }
        specs.push(spec);
    }
    Ok(specs)
}

/// Parse one element of the `DB_CONFIGS` array.
fn parse_entry(entry: &Value, index: usize) -> DbResult<DatabaseSpec> {
    let missing = || {
        DbError::config("Each database config must contain db_type, configuration, and description")
    };
    let obj = entry.as_object().ok_or_else(missing)?;

    let db_type = obj
        .get("db_type")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(missing)?;
    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .ok_or_else(missing)?;
    let configuration = match obj.get("configuration") {
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(DbError::config(format!(
                "configuration for '{description}' must be a JSON object"
            )));
        }
        None => return Err(missing()),
    };

    let engine = DatabaseType::parse(db_type)?;
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| derive_id(db_type, description, index));

    Ok(DatabaseSpec {
        id,
        db_type: db_type.to_string(),
        engine,
        configuration,
        description: description.to_string(),
    })
}

/// Parse the single-database `DB_CONFIG` form. The payload is sometimes
/// shipped double-encoded (a JSON string containing JSON); one extra
/// decode handles that.
fn parse_single(db_type: &str, payload: &str) -> DbResult<Vec<DatabaseSpec>> {
    let mut value: Value = serde_json::from_str(payload)
        .map_err(|e| DbError::config(format!("Error parsing DB_CONFIG: {e}")))?;
    if let Value::String(inner) = &value {
        value = serde_json::from_str(inner)
            .map_err(|e| DbError::config(format!("Error parsing DB_CONFIG: {e}")))?;
    }

    let configuration = value
        .as_object()
        .cloned()
        .ok_or_else(|| DbError::config("DB_CONFIG must be a JSON object"))?;
    if configuration.is_empty() {
        return Err(DbError::config(
            "Database type and configuration are required",
        ));
    }

    let engine = DatabaseType::parse(db_type)?;
    Ok(vec![DatabaseSpec {
        id: format!("{}_default", db_type.to_lowercase()),
        db_type: db_type.to_string(),
        engine,
        configuration,
        description: "Default database connection".to_string(),
    }])
}
