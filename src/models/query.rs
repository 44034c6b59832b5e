//! Query result and history data models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One column of a result set as reported by a query runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultColumn {
    pub name: String,
    /// Human-facing label some runners provide. Display paths prefer it
    /// over the raw name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
}

impl ResultColumn {
    /// Create a column with no friendly name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            friendly_name: None,
        }
    }

    /// Set the friendly name.
    pub fn with_friendly_name(mut self, friendly_name: impl Into<String>) -> Self {
        self.friendly_name = Some(friendly_name.into());
        self
    }

    /// Name used when rendering output.
    pub fn display_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.name)
    }
}

/// Decoded rows plus column metadata from one query execution.
/// Rows keep their original field maps, keyed by raw column name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Map<String, Value>>,
}

impl ResultSet {
    /// Create a result set.
    pub fn new(columns: Vec<ResultColumn>, rows: Vec<Map<String, Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Display names in column order.
    pub fn display_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.display_name().to_string())
            .collect()
    }

    /// Reorder each row map into column order, looking fields up by raw
    /// column name. Fields a row does not carry come back as JSON null.
    pub fn ordered_rows(&self) -> Vec<Vec<Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|col| row.get(&col.name).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    }
}

/// One executed query remembered by the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub database_id: String,
    pub description: String,
    pub query: String,
}

impl HistoryEntry {
    /// Create a history entry.
    pub fn new(
        database_id: impl Into<String>,
        description: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            database_id: database_id.into(),
            description: description.into(),
            query: query.into(),
        }
    }
}

impl std::fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] [{}] {}",
            self.database_id, self.description, self.query
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_display_name_prefers_friendly_name() {
        let plain = ResultColumn::new("user_id");
        assert_eq!(plain.display_name(), "user_id");

        let labeled = ResultColumn::new("user_id").with_friendly_name("User ID");
        assert_eq!(labeled.display_name(), "User ID");
    }

    #[test]
    fn test_ordered_rows_follow_column_order() {
        let result = ResultSet::new(
            vec![ResultColumn::new("id"), ResultColumn::new("name")],
            vec![
                row(&[("name", json!("alice")), ("id", json!(1))]),
                row(&[("id", json!(2)), ("name", json!("bob"))]),
            ],
        );

        let rows = result.ordered_rows();
        assert_eq!(rows[0], vec![json!(1), json!("alice")]);
        assert_eq!(rows[1], vec![json!(2), json!("bob")]);
    }

    #[test]
    fn test_ordered_rows_fill_missing_fields_with_null() {
        let result = ResultSet::new(
            vec![ResultColumn::new("id"), ResultColumn::new("email")],
            vec![row(&[("id", json!(7))])],
        );

        assert_eq!(result.ordered_rows()[0], vec![json!(7), Value::Null]);
    }

    #[test]
    fn test_ordered_rows_look_up_by_raw_name() {
        // Friendly names affect display only; row lookup stays on the raw name.
        let result = ResultSet::new(
            vec![ResultColumn::new("cnt").with_friendly_name("Count")],
            vec![row(&[("cnt", json!(42))])],
        );

        assert_eq!(result.display_names(), vec!["Count"]);
        assert_eq!(result.ordered_rows()[0], vec![json!(42)]);
    }

    #[test]
    fn test_history_entry_display() {
        let entry = HistoryEntry::new("pg_main_0", "Main DB", "SELECT 1");
        assert_eq!(entry.to_string(), "[pg_main_0] [Main DB] SELECT 1");
    }
}
