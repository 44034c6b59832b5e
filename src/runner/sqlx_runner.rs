//! sqlx-backed `QueryRunner` for PostgreSQL, MySQL, and SQLite.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Column, MySqlPool, PgPool, Row, SqlitePool};
use tracing::debug;

use super::QueryRunner;
use super::decode::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnSchema, DatabaseType, ResultColumn, ResultSet, TableSchema, is_safe_identifier,
};

const MAX_POOL_CONNECTIONS: u32 = 10;
/// SQLite pools hold a single connection so in-memory databases keep their
/// state across queries.
const MAX_POOL_CONNECTIONS_SQLITE: u32 = 1;

/// Database-specific connection pool (avoids AnyPool limitations).
#[derive(Debug, Clone)]
enum DbPool {
    MySql(MySqlPool),
    Postgres(PgPool),
    SQLite(SqlitePool),
}

/// Query runner backed by a sqlx connection pool.
#[derive(Debug)]
pub struct SqlxRunner {
    pool: DbPool,
}

impl SqlxRunner {
    /// Open a connection pool for the given engine and configuration map.
    ///
    /// The configuration accepts a `url`/`dsn` key used verbatim, or discrete
    /// keys (`host`, `port`, `user`, `password`, `dbname`; `dbpath` for
    /// SQLite) assembled through the engine's connect options.
    pub async fn connect(
        engine: DatabaseType,
        configuration: &Map<String, Value>,
    ) -> DbResult<Self> {
        let pool = match engine {
            DatabaseType::PostgreSQL => connect_postgres(configuration).await?,
            DatabaseType::MySQL => connect_mysql(configuration).await?,
            DatabaseType::SQLite => connect_sqlite(configuration).await?,
        };
        Ok(Self { pool })
    }

    /// Columns of one table. A table reporting no columns does not exist.
    async fn describe_columns(&self, table: &str) -> DbResult<Vec<ColumnSchema>> {
        let columns = match &self.pool {
            DbPool::MySql(pool) => table_columns_mysql(pool, table).await?,
            DbPool::Postgres(pool) => table_columns_postgres(pool, table).await?,
            DbPool::SQLite(pool) => table_columns_sqlite(pool, table).await?,
        };
        if columns.is_empty() {
            return Err(DbError::schema(format!("Table '{table}' not found"), table));
        }
        Ok(columns)
    }
}

#[async_trait]
impl QueryRunner for SqlxRunner {
    async fn test_connection(&self) -> DbResult<()> {
        match &self.pool {
            DbPool::MySql(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            DbPool::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            DbPool::SQLite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
        }
        Ok(())
    }

    async fn fetch_schema(&self) -> DbResult<Vec<TableSchema>> {
        match &self.pool {
            DbPool::MySql(pool) => fetch_schema_mysql(pool).await,
            DbPool::Postgres(pool) => fetch_schema_postgres(pool).await,
            DbPool::SQLite(pool) => fetch_schema_sqlite(pool).await,
        }
    }

    async fn run_query(&self, sql: &str) -> DbResult<ResultSet> {
        debug!(sql = %sql, "Executing query");
        match &self.pool {
            DbPool::MySql(pool) => {
                let rows = sqlx::query(sql).fetch_all(pool).await?;
                Ok(build_result_set(&rows))
            }
            DbPool::Postgres(pool) => {
                let rows = sqlx::query(sql).fetch_all(pool).await?;
                Ok(build_result_set(&rows))
            }
            DbPool::SQLite(pool) => {
                let rows = sqlx::query(sql).fetch_all(pool).await?;
                Ok(build_result_set(&rows))
            }
        }
    }

    async fn table_columns(&self, table: &str) -> DbResult<Vec<String>> {
        let columns = self.describe_columns(table).await?;
        Ok(columns.into_iter().map(|c| c.name).collect())
    }

    async fn table_types(&self, table: &str) -> DbResult<HashMap<String, String>> {
        let columns = self.describe_columns(table).await?;
        Ok(columns
            .into_iter()
            .filter_map(|c| c.data_type.map(|t| (c.name, t)))
            .collect())
    }

    async fn close(&self) {
        match &self.pool {
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::SQLite(pool) => pool.close().await,
        }
    }
}

// =============================================================================
// Connection
// =============================================================================

async fn connect_postgres(configuration: &Map<String, Value>) -> DbResult<DbPool> {
    let pool = if let Some(url) = config_str(configuration, &["url", "dsn"]) {
        PgPoolOptions::new()
            .max_connections(MAX_POOL_CONNECTIONS)
            .connect(&url)
            .await
            .map_err(connect_error)?
    } else {
        let host = config_str(configuration, &["host"])
            .ok_or_else(|| DbError::config("PostgreSQL configuration requires a url or host"))?;

        let mut options = PgConnectOptions::new().host(&host);
        if let Some(port) = config_port(configuration)? {
            options = options.port(port);
        }
        if let Some(user) = config_str(configuration, &["user", "username"]) {
            options = options.username(&user);
        }
        if let Some(password) = config_str(configuration, &["password"]) {
            options = options.password(&password);
        }
        if let Some(dbname) = config_str(configuration, &["dbname", "database"]) {
            options = options.database(&dbname);
        }

        PgPoolOptions::new()
            .max_connections(MAX_POOL_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(connect_error)?
    };
    Ok(DbPool::Postgres(pool))
}

async fn connect_mysql(configuration: &Map<String, Value>) -> DbResult<DbPool> {
    let options = if let Some(url) = config_str(configuration, &["url", "dsn"]) {
        MySqlConnectOptions::from_str(&url)
            .map_err(|e| DbError::config(format!("Invalid MySQL connection string: {e}")))?
    } else {
        let host = config_str(configuration, &["host"])
            .ok_or_else(|| DbError::config("MySQL configuration requires a url or host"))?;

        let mut options = MySqlConnectOptions::new().host(&host);
        if let Some(port) = config_port(configuration)? {
            options = options.port(port);
        }
        if let Some(user) = config_str(configuration, &["user", "username"]) {
            options = options.username(&user);
        }
        if let Some(password) = config_str(configuration, &["password"]) {
            options = options.password(&password);
        }
        if let Some(dbname) = config_str(configuration, &["dbname", "database"]) {
            options = options.database(&dbname);
        }
        options
    };

    let pool = MySqlPoolOptions::new()
        .max_connections(MAX_POOL_CONNECTIONS)
        .connect_with(options.charset("utf8mb4"))
        .await
        .map_err(connect_error)?;
    Ok(DbPool::MySql(pool))
}

async fn connect_sqlite(configuration: &Map<String, Value>) -> DbResult<DbPool> {
    let url = if let Some(url) = config_str(configuration, &["url", "dsn"]) {
        url
    } else {
        let path = config_str(configuration, &["dbpath", "path"])
            .ok_or_else(|| DbError::config("SQLite configuration requires a url or dbpath"))?;
        format!("sqlite:{path}")
    };

    let options = SqliteConnectOptions::from_str(&url)
        .map_err(|e| DbError::config(format!("Invalid SQLite connection string: {e}")))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_POOL_CONNECTIONS_SQLITE)
        .connect_with(options)
        .await
        .map_err(connect_error)?;
    Ok(DbPool::SQLite(pool))
}

fn connect_error(e: sqlx::Error) -> DbError {
    DbError::engine(format!("Failed to connect: {e}"))
}

/// First string value found under any of the given keys.
fn config_str(configuration: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| configuration.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Port value, accepting either a JSON number or a numeric string.
fn config_port(configuration: &Map<String, Value>) -> DbResult<Option<u16>> {
    let Some(value) = configuration.get("port") else {
        return Ok(None);
    };

    let port = match value {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => s.parse::<u16>().ok(),
        _ => None,
    };

    match port {
        Some(port) => Ok(Some(port)),
        None => Err(DbError::config(format!("Invalid port value: {value}"))),
    }
}

// =============================================================================
// Result Collection
// =============================================================================

/// Collect fetched rows into a `ResultSet`, taking column order from the
/// first row's metadata. Statements producing no rows yield an empty set.
fn build_result_set<R>(rows: &[R]) -> ResultSet
where
    R: RowToJson + Row,
{
    let columns = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|col| ResultColumn::new(col.name()))
                .collect()
        })
        .unwrap_or_default();

    let json_rows = rows.iter().map(RowToJson::to_json_map).collect();
    ResultSet::new(columns, json_rows)
}

// =============================================================================
// Schema Introspection
// =============================================================================

mod queries {
    pub const SQLITE_LIST_TABLES: &str = "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

    pub const POSTGRES_LIST_TABLES: &str = "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_type = 'BASE TABLE' ORDER BY table_name";

    pub const POSTGRES_TABLE_COLUMNS: &str =
        "SELECT column_name, data_type FROM information_schema.columns \
         WHERE table_name = $1 AND table_schema = 'public' ORDER BY ordinal_position";

    // CONVERT forces utf8 since some MySQL versions report these columns as
    // binary strings
    pub const MYSQL_LIST_TABLES: &str =
        "SELECT CONVERT(table_name USING utf8) AS table_name FROM information_schema.tables \
         WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' ORDER BY table_name";

    pub const MYSQL_TABLE_COLUMNS: &str =
        "SELECT CONVERT(column_name USING utf8) AS column_name, \
         CONVERT(data_type USING utf8) AS data_type FROM information_schema.columns \
         WHERE table_name = ? AND table_schema = DATABASE() ORDER BY ordinal_position";
}

async fn fetch_schema_postgres(pool: &PgPool) -> DbResult<Vec<TableSchema>> {
    let tables: Vec<(String,)> = sqlx::query_as(queries::POSTGRES_LIST_TABLES)
        .fetch_all(pool)
        .await?;

    let mut schema = Vec::with_capacity(tables.len());
    for (table,) in tables {
        let columns = table_columns_postgres(pool, &table).await?;
        schema.push(TableSchema {
            name: table,
            columns,
        });
    }
    Ok(schema)
}

async fn fetch_schema_mysql(pool: &MySqlPool) -> DbResult<Vec<TableSchema>> {
    let tables: Vec<(String,)> = sqlx::query_as(queries::MYSQL_LIST_TABLES)
        .fetch_all(pool)
        .await?;

    let mut schema = Vec::with_capacity(tables.len());
    for (table,) in tables {
        let columns = table_columns_mysql(pool, &table).await?;
        schema.push(TableSchema {
            name: table,
            columns,
        });
    }
    Ok(schema)
}

async fn fetch_schema_sqlite(pool: &SqlitePool) -> DbResult<Vec<TableSchema>> {
    let tables: Vec<(String,)> = sqlx::query_as(queries::SQLITE_LIST_TABLES)
        .fetch_all(pool)
        .await?;

    let mut schema = Vec::with_capacity(tables.len());
    for (table,) in tables {
        let columns = table_columns_sqlite(pool, &table).await?;
        schema.push(TableSchema {
            name: table,
            columns,
        });
    }
    Ok(schema)
}

async fn table_columns_postgres(pool: &PgPool, table: &str) -> DbResult<Vec<ColumnSchema>> {
    let rows: Vec<(String, String)> = sqlx::query_as(queries::POSTGRES_TABLE_COLUMNS)
        .bind(table)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(name, data_type)| ColumnSchema::new(name, Some(data_type)))
        .collect())
}

async fn table_columns_mysql(pool: &MySqlPool, table: &str) -> DbResult<Vec<ColumnSchema>> {
    let rows: Vec<(String, String)> = sqlx::query_as(queries::MYSQL_TABLE_COLUMNS)
        .bind(table)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(name, data_type)| ColumnSchema::new(name, Some(data_type)))
        .collect())
}

async fn table_columns_sqlite(pool: &SqlitePool, table: &str) -> DbResult<Vec<ColumnSchema>> {
    // PRAGMA arguments cannot be bound, so the table name is validated and
    // quoted before interpolation
    if !is_safe_identifier(table) {
        return Err(DbError::schema(format!("Invalid table name: {table}"), table));
    }
    let quoted = DatabaseType::SQLite.quote_identifier(table);
    let sql = format!("PRAGMA table_info({quoted})");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let name: String = row.try_get("name")?;
        let declared: String = row.try_get("type")?;
        columns.push(ColumnSchema::new(
            name,
            (!declared.is_empty()).then_some(declared),
        ));
    }
    Ok(columns)
}
