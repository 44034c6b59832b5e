//! Database discovery tools: listings, info blocks, table search, history.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::DbResult;
use crate::registry::Database;
use crate::session::SessionContext;

/// Input for the get_database_info tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DatabaseInfoInput {
    /// Database ID from list_databases. Omit for all databases
    #[serde(default)]
    pub db_id: Option<String>,
}

/// Input for the find_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FindTableInput {
    /// Table name to search for
    pub table_name: String,
}

/// List every configured database with its ID, label, and engine tag.
pub async fn list_databases(ctx: &SessionContext) -> DbResult<String> {
    let registry = ctx.registry();
    if registry.is_empty() {
        return Ok("No database connections available.".to_string());
    }

    let mut lines = Vec::with_capacity(registry.len());
    for database in registry.all() {
        let mut line = format!(
            "ID: {} - {} (Type: {})",
            database.id, database.description, database.db_type
        );
        if let Some(tables) = database.cached_schema().await {
            line.push_str(&format!(" - {} tables", tables.len()));
        }
        lines.push(line);
    }

    Ok(format!("Available databases:\n{}", lines.join("\n")))
}

/// Detailed info for one database, or for all when no ID is given.
pub async fn get_database_info(ctx: &SessionContext, db_id: Option<&str>) -> DbResult<String> {
    let registry = ctx.registry();

    match db_id {
        None => {
            let mut blocks = Vec::with_capacity(registry.len());
            for database in registry.all() {
                blocks.push(info_block(database).await);
            }
            Ok(blocks.join("\n\n"))
        }
        Some(id) => {
            let database = registry.lookup(id)?;
            Ok(info_block(&database).await)
        }
    }
}

async fn info_block(database: &Database) -> String {
    format!(
        "Database ID: {}\nDescription: {}\nType: {}\nSchema Summary:\n{}",
        database.id,
        database.description,
        database.db_type,
        schema_summary(database).await
    )
}

/// Compact schema listing: first 10 tables with up to 5 column names each.
async fn schema_summary(database: &Database) -> String {
    let Some(tables) = database.cached_schema().await else {
        return "Schema information not available".to_string();
    };
    if tables.is_empty() {
        return "No tables found in schema".to_string();
    }

    let mut lines = Vec::with_capacity(tables.len().min(11));
    for table in tables.iter().take(10) {
        let mut column_str = table
            .columns
            .iter()
            .take(5)
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if table.columns.len() > 5 {
            column_str.push_str(", ...");
        }
        lines.push(format!("- {} ({column_str})", table.name));
    }
    if tables.len() > 10 {
        lines.push(format!("... and {} more tables", tables.len() - 10));
    }

    lines.join("\n")
}

/// Find which databases contain a table, by exact name match over cached
/// schemas. Databases without a cached schema are skipped.
pub async fn find_table(ctx: &SessionContext, table_name: &str) -> DbResult<String> {
    let mut found = Vec::new();
    for database in ctx.registry().all() {
        let Some(tables) = database.cached_schema().await else {
            continue;
        };
        if tables.iter().any(|t| t.name == table_name) {
            found.push(format!(
                "- Database ID: {} - {} (Type: {})\n",
                database.id, database.description, database.db_type
            ));
        }
    }

    if found.is_empty() {
        return Ok(format!(
            "Table '{table_name}' was not found in any database schema."
        ));
    }

    Ok(format!(
        "Table '{table_name}' was found in the following databases:\n{}",
        found.concat()
    ))
}

/// Session query history in execution order.
pub async fn get_query_history(ctx: &SessionContext) -> DbResult<String> {
    let history = ctx.history().await;
    if history.is_empty() {
        return Ok("No query history available".to_string());
    }

    let mut result = String::from("Query History:\n");
    for entry in &history {
        result.push_str(&entry.to_string());
        result.push('\n');
    }
    Ok(result)
}
