//! Schema export tool backing both the get_schema tool and the schema
//! resources.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::DbResult;
use crate::registry::Database;
use crate::session::SessionContext;

/// Input for the get_schema tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetSchemaInput {
    /// Database ID from list_databases, or "all" for every database
    #[serde(default)]
    pub db_id: Option<String>,
}

/// Schemas as JSON: one entry per database, or a single entry for one ID.
///
/// Every entry comes from a live fetch. Fetch failures are embedded as an
/// `error` field instead of failing the whole call, and successful fetches
/// refresh the descriptor's cached schema.
pub async fn get_schema(ctx: &SessionContext, db_id: Option<&str>) -> DbResult<String> {
    let registry = ctx.registry();

    match db_id {
        None | Some("all") => {
            let mut entries = Vec::with_capacity(registry.len());
            for database in registry.all() {
                entries.push(schema_entry(database).await);
            }
            Ok(serde_json::to_string(&Value::Array(entries))?)
        }
        Some(id) => {
            let database = registry.lookup(id)?;
            Ok(serde_json::to_string(&schema_entry(&database).await)?)
        }
    }
}

async fn schema_entry(database: &Database) -> Value {
    match database.refresh_schema().await {
        Ok(tables) => json!({
            "id": database.id,
            "description": database.description,
            "db_type": database.db_type,
            "schema": { "tables": tables },
        }),
        Err(e) => json!({
            "id": database.id,
            "description": database.description,
            "db_type": database.db_type,
            "error": e.to_string(),
        }),
    }
}
