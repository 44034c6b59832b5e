//! Query execution backends.
//!
//! `QueryRunner` is the seam between the MCP tool layer and the actual
//! database driver: tools and the registry talk to `Arc<dyn QueryRunner>`,
//! and `SqlxRunner` provides the sqlx-backed implementation for PostgreSQL,
//! MySQL, and SQLite.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::DbResult;
use crate::models::{ResultSet, TableSchema};

mod decode;
mod sqlx_runner;

pub use sqlx_runner::SqlxRunner;

/// Executes queries and schema lookups against one database connection.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Verify the connection is usable.
    async fn test_connection(&self) -> DbResult<()>;

    /// Fetch the full table/column layout of the database.
    async fn fetch_schema(&self) -> DbResult<Vec<TableSchema>>;

    /// Run a SQL statement and collect all result rows.
    async fn run_query(&self, sql: &str) -> DbResult<ResultSet>;

    /// Column names of a single table, in ordinal order.
    async fn table_columns(&self, table: &str) -> DbResult<Vec<String>>;

    /// Column name to declared type mapping for a single table.
    async fn table_types(&self, table: &str) -> DbResult<HashMap<String, String>>;

    /// Release the underlying connection resources. Called once at shutdown.
    async fn close(&self) {}
}
