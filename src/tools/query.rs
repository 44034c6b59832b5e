//! Query execution tools.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::error::{DbError, DbResult};
use crate::session::SessionContext;
use crate::tools::format::{database_json, markdown_table};

/// Rows shown inline by `execute_query` before the output is elided.
const DISPLAY_ROW_LIMIT: usize = 10;

/// Input for the execute_query and execute_query_json tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteQueryInput {
    /// SQL statement to execute
    pub query: String,
    /// Database ID from list_databases
    pub db_id: String,
}

/// Execute a query and render the first rows as a markdown table.
pub async fn execute_query(ctx: &SessionContext, query: &str, db_id: &str) -> DbResult<String> {
    let database = ctx.registry().lookup(db_id)?;
    let result = ctx
        .execute(&database, query)
        .await
        .map_err(|e| DbError::operation("executing query", e))?;

    let mut output = format!(
        "Query executed on Database: {}\n\n{}",
        database.description,
        markdown_table(&result, DISPLAY_ROW_LIMIT)
    );

    let total = result.row_count();
    if total > DISPLAY_ROW_LIMIT {
        output.push_str(&format!(
            "\n\n... and {} more rows (total: {})",
            total - DISPLAY_ROW_LIMIT,
            total
        ));
    }

    Ok(output)
}

/// Execute a query and return the full result as pretty-printed JSON.
pub async fn execute_query_json(
    ctx: &SessionContext,
    query: &str,
    db_id: &str,
) -> DbResult<String> {
    let database = ctx.registry().lookup(db_id)?;
    let result = ctx
        .execute(&database, query)
        .await
        .map_err(|e| DbError::operation("executing query", e))?;

    let row_count = result.row_count();
    let columns = result.display_names();
    let output = json!({
        "database": database_json(&database),
        "columns": columns,
        "rows": result.rows,
        "row_count": row_count,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use tokio::sync::RwLock;

    use crate::models::{DatabaseType, ResultColumn, ResultSet, TableSchema};
    use crate::registry::{Database, DatabaseRegistry};
    use crate::runner::QueryRunner;

    /// Returns `row_count` rows of `(id, label)` with a friendly name on the
    /// label column, or an error when the query contains "boom".
    struct ScriptedRunner {
        row_count: usize,
    }

    #[async_trait]
    impl QueryRunner for ScriptedRunner {
        async fn test_connection(&self) -> DbResult<()> {
            Ok(())
        }

        async fn fetch_schema(&self) -> DbResult<Vec<TableSchema>> {
            Ok(Vec::new())
        }

        async fn run_query(&self, sql: &str) -> DbResult<ResultSet> {
            if sql.contains("boom") {
                return Err(DbError::engine("table is on fire"));
            }

            let columns = vec![
                ResultColumn::new("id"),
                ResultColumn::new("label").with_friendly_name("Label"),
            ];
            let rows = (0..self.row_count)
                .map(|i| {
                    let mut row = Map::new();
                    row.insert("id".to_string(), json!(i));
                    row.insert("label".to_string(), json!(format!("row{i}")));
                    row
                })
                .collect();
            Ok(ResultSet::new(columns, rows))
        }

        async fn table_columns(&self, _table: &str) -> DbResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn table_types(&self, _table: &str) -> DbResult<HashMap<String, String>> {
            Ok(HashMap::new())
        }
    }

    fn context_with_rows(row_count: usize) -> SessionContext {
        let database = Arc::new(Database {
            id: "sq_test_0".to_string(),
            db_type: "sqlite".to_string(),
            engine: DatabaseType::SQLite,
            description: "Test DB".to_string(),
            configuration: Map::new(),
            schema: RwLock::new(None),
            runner: Arc::new(ScriptedRunner { row_count }),
        });
        SessionContext::new(DatabaseRegistry::from_databases(vec![database]))
    }

    #[tokio::test]
    async fn test_execute_query_renders_markdown() {
        let ctx = context_with_rows(2);

        let output = execute_query(&ctx, "SELECT * FROM t", "sq_test_0")
            .await
            .unwrap();
        assert_eq!(
            output,
            "Query executed on Database: Test DB\n\n\
             id | Label\n--- | ---\n0 | row0\n1 | row1"
        );
    }

    #[tokio::test]
    async fn test_execute_query_elides_after_ten_rows() {
        let ctx = context_with_rows(14);

        let output = execute_query(&ctx, "SELECT * FROM t", "sq_test_0")
            .await
            .unwrap();
        assert!(output.contains("9 | row9"));
        assert!(!output.contains("10 | row10"));
        assert!(output.ends_with("\n\n... and 4 more rows (total: 14)"));
    }

    #[tokio::test]
    async fn test_execute_query_exactly_ten_rows_has_no_elision() {
        let ctx = context_with_rows(10);

        let output = execute_query(&ctx, "SELECT * FROM t", "sq_test_0")
            .await
            .unwrap();
        assert!(output.contains("9 | row9"));
        assert!(!output.contains("more rows"));
    }

    #[tokio::test]
    async fn test_execute_query_unknown_id() {
        let ctx = context_with_rows(1);

        let err = execute_query(&ctx, "SELECT 1", "nope").await.unwrap_err();
        assert_eq!(err.user_message(), "Error: Invalid database ID nope");
    }

    #[tokio::test]
    async fn test_execute_query_engine_failure() {
        let ctx = context_with_rows(1);

        let err = execute_query(&ctx, "SELECT boom", "sq_test_0")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Error executing query: table is on fire");
    }

    #[tokio::test]
    async fn test_execute_query_json_envelope() {
        let ctx = context_with_rows(2);

        let output = execute_query_json(&ctx, "SELECT * FROM t", "sq_test_0")
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["database"]["id"], "sq_test_0");
        assert_eq!(parsed["database"]["description"], "Test DB");
        assert_eq!(parsed["database"]["db_type"], "sqlite");
        assert_eq!(parsed["columns"], json!(["id", "Label"]));
        assert_eq!(parsed["row_count"], 2);
        // Raw rows keep original field names, not friendly names
        assert_eq!(parsed["rows"][0]["label"], "row0");
    }

    #[tokio::test]
    async fn test_execute_query_json_counts_all_rows() {
        let ctx = context_with_rows(14);

        let output = execute_query_json(&ctx, "SELECT * FROM t", "sq_test_0")
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["row_count"], 14);
        assert_eq!(parsed["rows"].as_array().unwrap().len(), 14);
    }

    #[tokio::test]
    async fn test_both_variants_share_history() {
        let ctx = context_with_rows(1);

        execute_query(&ctx, "SELECT 1", "sq_test_0").await.unwrap();
        execute_query_json(&ctx, "SELECT 2", "sq_test_0")
            .await
            .unwrap();

        assert_eq!(ctx.history().await.len(), 2);
    }
}
