//! Output formatting shared by the tool handlers.

use serde_json::{Value as JsonValue, json};

use crate::models::ResultSet;
use crate::registry::Database;

/// Render a single cell value for markdown output.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

/// Render up to `max_rows` rows as a markdown table: display-name header,
/// `---` separator, cells joined with ` | `.
pub fn markdown_table(result: &ResultSet, max_rows: usize) -> String {
    let header = result.display_names().join(" | ");
    let separator = vec!["---"; result.columns.len()].join(" | ");

    let rows: Vec<String> = result
        .ordered_rows()
        .iter()
        .take(max_rows)
        .map(|row| {
            row.iter()
                .map(format_value)
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect();

    format!("{header}\n{separator}\n{}", rows.join("\n"))
}

/// Identifying envelope for a database in JSON payloads.
pub fn database_json(database: &Database) -> JsonValue {
    json!({
        "id": database.id,
        "description": database.description,
        "db_type": database.db_type,
    })
}
