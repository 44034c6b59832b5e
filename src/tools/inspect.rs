//! Table inspection tools: column listings, type maps, descriptions, samples.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::error::{DbError, DbResult};
use crate::models::is_safe_identifier;
use crate::session::SessionContext;
use crate::tools::format::{database_json, markdown_table};

const DEFAULT_SAMPLE_ROWS: u32 = 10;
/// Hard cap on rows returned by get_table_sample.
const MAX_SAMPLE_ROWS: u32 = 100;

/// Input for tools operating on one table.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TableInput {
    /// Table name
    pub table_name: String,
    /// Database ID from list_databases
    pub db_id: String,
}

/// Input for the get_table_sample tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TableSampleInput {
    /// Table name
    pub table_name: String,
    /// Database ID from list_databases
    pub db_id: String,
    /// Maximum rows to return. Default: 10, capped at 100
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Column names of a table as a JSON envelope.
pub async fn get_table_columns(
    ctx: &SessionContext,
    table_name: &str,
    db_id: &str,
) -> DbResult<String> {
    let database = ctx.registry().lookup(db_id)?;
    let columns = database
        .runner
        .table_columns(table_name)
        .await
        .map_err(|e| DbError::operation(format!("getting columns for table {table_name}"), e))?;

    let output = json!({
        "database": database_json(&database),
        "table": table_name,
        "columns": columns,
    });
    Ok(serde_json::to_string(&output)?)
}

/// Column name to type mapping of a table as a JSON envelope.
pub async fn get_table_types(
    ctx: &SessionContext,
    table_name: &str,
    db_id: &str,
) -> DbResult<String> {
    let database = ctx.registry().lookup(db_id)?;
    let types = database
        .runner
        .table_types(table_name)
        .await
        .map_err(|e| DbError::operation(format!("getting types for table {table_name}"), e))?;

    let output = json!({
        "database": database_json(&database),
        "table": table_name,
        "types": types,
    });
    Ok(serde_json::to_string(&output)?)
}

/// Human-readable table description: one line per column with its type.
pub async fn describe_table(
    ctx: &SessionContext,
    table_name: &str,
    db_id: &str,
) -> DbResult<String> {
    let database = ctx.registry().lookup(db_id)?;

    let columns = database
        .runner
        .table_columns(table_name)
        .await
        .map_err(|e| DbError::operation(format!("describing table {table_name}"), e))?;
    let types = database
        .runner
        .table_types(table_name)
        .await
        .map_err(|e| DbError::operation(format!("describing table {table_name}"), e))?;

    let mut description = format!(
        "Table: {} in Database: {}\n\nColumns:\n",
        table_name, database.description
    );
    for column in &columns {
        let column_type = types.get(column).map(String::as_str).unwrap_or("unknown");
        description.push_str(&format!("- {column} ({column_type})\n"));
    }
    Ok(description)
}

/// Sample rows from a table as a markdown table.
///
/// The table name is interpolated into the statement, so it is restricted to
/// `[A-Za-z0-9_.]` and quoted per engine first. Sampling bypasses the
/// session, so it leaves the query history untouched.
pub async fn get_table_sample(
    ctx: &SessionContext,
    table_name: &str,
    db_id: &str,
    limit: Option<u32>,
) -> DbResult<String> {
    let database = ctx.registry().lookup(db_id)?;

    if !is_safe_identifier(table_name) {
        return Err(DbError::operation(
            format!("getting sample data from table {table_name}"),
            DbError::schema(format!("Invalid table name: {table_name}"), table_name),
        ));
    }

    let quoted = database.engine.quote_identifier(table_name);
    let limit = limit.unwrap_or(DEFAULT_SAMPLE_ROWS).min(MAX_SAMPLE_ROWS);
    let sql = format!("SELECT * FROM {quoted} LIMIT {limit}");

    let result = database.runner.run_query(&sql).await.map_err(|e| {
        DbError::operation(format!("getting sample data from table {table_name}"), e)
    })?;

    let mut output = format!(
        "Sample data from table '{}' in Database: {}\n\n{}",
        table_name,
        database.description,
        markdown_table(&result, result.row_count())
    );
    if result.row_count() == 0 {
        output.push_str("\n\nNo data found in table.");
    }
    Ok(output)
}
