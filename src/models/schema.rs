//! Schema and engine-type data models.
//!
//! `DatabaseType` is the parsed form of the `db_type` tag from configuration;
//! the verbatim tag is kept separately for display. `TableSchema` and
//! `ColumnSchema` carry introspected table structure and serialize into the
//! shape embedded in schema resources.

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse an engine tag as it appears in configuration.
    pub fn parse(tag: &str) -> DbResult<Self> {
        match tag.to_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(Self::PostgreSQL),
            "mysql" | "mariadb" => Ok(Self::MySQL),
            "sqlite" | "sqlite3" => Ok(Self::SQLite),
            other => Err(DbError::config(format!(
                "Unsupported database type: {other}"
            ))),
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Quote an identifier for interpolation into SQL.
    /// Dotted names (`schema.table`) are quoted per segment.
    pub fn quote_identifier(&self, identifier: &str) -> String {
        identifier
            .split('.')
            .map(|part| match self {
                Self::MySQL => format!("`{part}`"),
                Self::PostgreSQL | Self::SQLite => format!("\"{part}\""),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Check that a table identifier contains only word characters and dots.
/// Anything else is rejected before the name reaches SQL interpolation.
pub fn is_safe_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// One table in a cached or freshly fetched schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Create a table schema with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column.
    pub fn with_column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// One column within a table schema. The type string is engine-reported
/// and may be absent (e.g. untyped SQLite expression columns).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ColumnSchema {
    /// Create a column schema.
    pub fn new(name: impl Into<String>, data_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_parse_aliases() {
        assert_eq!(DatabaseType::parse("pg").unwrap(), DatabaseType::PostgreSQL);
        assert_eq!(
            DatabaseType::parse("postgres").unwrap(),
            DatabaseType::PostgreSQL
        );
        assert_eq!(
            DatabaseType::parse("PostgreSQL").unwrap(),
            DatabaseType::PostgreSQL
        );
        assert_eq!(DatabaseType::parse("mysql").unwrap(), DatabaseType::MySQL);
        assert_eq!(DatabaseType::parse("mariadb").unwrap(), DatabaseType::MySQL);
        assert_eq!(DatabaseType::parse("sqlite").unwrap(), DatabaseType::SQLite);
        assert_eq!(
            DatabaseType::parse("sqlite3").unwrap(),
            DatabaseType::SQLite
        );
    }

    #[test]
    fn test_database_type_parse_unknown() {
        let err = DatabaseType::parse("oracle").unwrap_err();
        assert!(err.to_string().contains("Unsupported database type"));
    }

    #[test]
    fn test_quote_identifier_per_engine() {
        assert_eq!(
            DatabaseType::PostgreSQL.quote_identifier("users"),
            "\"users\""
        );
        assert_eq!(DatabaseType::MySQL.quote_identifier("users"), "`users`");
        assert_eq!(DatabaseType::SQLite.quote_identifier("users"), "\"users\"");
    }

    #[test]
    fn test_quote_identifier_dotted() {
        assert_eq!(
            DatabaseType::PostgreSQL.quote_identifier("public.users"),
            "\"public\".\"users\""
        );
        assert_eq!(
            DatabaseType::MySQL.quote_identifier("app.users"),
            "`app`.`users`"
        );
    }

    #[test]
    fn test_safe_identifier() {
        assert!(is_safe_identifier("users"));
        assert!(is_safe_identifier("public.users"));
        assert!(is_safe_identifier("order_items_2024"));
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("users; DROP TABLE users"));
        assert!(!is_safe_identifier("users--"));
        assert!(!is_safe_identifier("users`"));
        assert!(!is_safe_identifier("us ers"));
    }

    #[test]
    fn test_table_schema_builder() {
        let table = TableSchema::new("users")
            .with_column(ColumnSchema::new("id", Some("INTEGER".into())))
            .with_column(ColumnSchema::new("name", Some("TEXT".into())));

        assert_eq!(table.name, "users");
        assert_eq!(table.column_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_column_schema_serialization() {
        let col = ColumnSchema::new("id", Some("INTEGER".to_string()));
        let json = serde_json::to_string(&col).unwrap();
        assert_eq!(json, r#"{"name":"id","type":"INTEGER"}"#);

        // Absent type must not appear in JSON
        let untyped = ColumnSchema::new("expr", None);
        let json = serde_json::to_string(&untyped).unwrap();
        assert_eq!(json, r#"{"name":"expr"}"#);
    }

    #[test]
    fn test_table_schema_deserialization() {
        let table: TableSchema = serde_json::from_str(
            r#"{"name":"orders","columns":[{"name":"id","type":"bigint"},{"name":"note"}]}"#,
        )
        .unwrap();
        assert_eq!(table.name, "orders");
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[1].data_type, None);
    }
}
