//! Error types for the multi-database MCP server.
//!
//! All fallible paths use `DbError` via `thiserror`. Tool operations never
//! surface these as protocol faults: the service layer renders them into
//! inline strings with [`DbError::user_message`] at a single point, so the
//! error that reaches an AI assistant is always a readable sentence.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid database ID {database_id}")]
    UnknownDatabase { database_id: String },

    #[error("No database connections available")]
    EmptyRegistry,

    /// Failure reported by the underlying database engine.
    #[error("{message}")]
    Engine { message: String },

    /// Introspection failure tied to a specific object (table, column).
    #[error("{message}")]
    Schema { message: String, object: String },

    /// An engine or schema failure wrapped with the operation that hit it.
    /// Displays in the exact shape surfaced to clients, e.g.
    /// "Error executing query: near \"SELEC\": syntax error".
    #[error("Error {action}: {message}")]
    Operation { action: String, message: String },

    #[error("JSON encoding failed: {message}")]
    Serialize { message: String },

    /// Transport-level failure (stdio stream, HTTP bind or serve).
    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unknown-database lookup error.
    pub fn unknown_database(database_id: impl Into<String>) -> Self {
        Self::UnknownDatabase {
            database_id: database_id.into(),
        }
    }

    /// Create an engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Create a schema error naming the object involved.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Wrap a lower-level error with the operation it interrupted.
    /// The action reads as a gerund phrase: "executing query",
    /// "getting columns for table users".
    pub fn operation(action: impl Into<String>, source: DbError) -> Self {
        Self::Operation {
            action: action.into(),
            message: source.to_string(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Render as the inline string surfaced through tool results.
    ///
    /// Operation errors already carry their "Error {action}: ..." shape;
    /// everything else gets a plain "Error: " prefix. The empty-registry
    /// message is used verbatim as the reference listing output.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyRegistry => self.to_string(),
            Self::Operation { .. } => self.to_string(),
            other => format!("Error: {other}"),
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::config(msg.to_string()),
            sqlx::Error::Database(db_err) => DbError::engine(db_err.message().to_string()),
            sqlx::Error::RowNotFound => DbError::engine("No rows returned"),
            sqlx::Error::PoolTimedOut => DbError::engine("Connection pool acquire timed out"),
            sqlx::Error::PoolClosed => DbError::engine("Connection pool is closed"),
            sqlx::Error::Io(io_err) => DbError::engine(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => DbError::engine(format!("TLS error: {}", tls_err)),
            sqlx::Error::Protocol(msg) => DbError::engine(format!("Protocol error: {}", msg)),
            sqlx::Error::TypeNotFound { type_name } => DbError::schema(
                format!("Type not found: {}", type_name),
                type_name.to_string(),
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::engine(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::engine(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::engine(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::engine("Database worker crashed"),
            _ => DbError::engine(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialize {
            message: err.to_string(),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Convert DbError to MCP ErrorData for the handlers that do return
/// protocol errors (resources and prompts). Tool operations never take
/// this path; they render strings instead.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::UnknownDatabase { database_id } => rmcp::ErrorData::resource_not_found(
                err.to_string(),
                Some(serde_json::json!({ "database_id": database_id })),
            ),
            DbError::EmptyRegistry => {
                rmcp::ErrorData::resource_not_found(err.to_string(), None)
            }
            DbError::Config { .. } => rmcp::ErrorData::invalid_params(err.to_string(), None),
            DbError::Schema { object, .. } => rmcp::ErrorData::invalid_params(
                err.to_string(),
                Some(serde_json::json!({ "object": object })),
            ),
            _ => rmcp::ErrorData::internal_error(err.to_string(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_database_display() {
        let err = DbError::unknown_database("pg_db");
        assert_eq!(err.to_string(), "Invalid database ID pg_db");
        assert_eq!(err.user_message(), "Error: Invalid database ID pg_db");
    }

    #[test]
    fn test_empty_registry_has_no_error_prefix() {
        let err = DbError::EmptyRegistry;
        assert_eq!(err.user_message(), "No database connections available");
    }

    #[test]
    fn test_operation_wraps_engine_message() {
        let err = DbError::operation("executing query", DbError::engine("syntax error"));
        assert_eq!(err.user_message(), "Error executing query: syntax error");
    }

    #[test]
    fn test_operation_wraps_schema_message() {
        let err = DbError::operation(
            "getting columns for table users",
            DbError::schema("Table 'users' not found", "users"),
        );
        assert_eq!(
            err.user_message(),
            "Error getting columns for table users: Table 'users' not found"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = DbError::config("DB_CONFIGS must be a non-empty JSON array");
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_sqlx_database_error_flattens_to_engine() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::Engine { .. }));
    }

    #[test]
    fn test_serde_error_maps_to_serialize() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: DbError = bad.unwrap_err().into();
        assert!(matches!(err, DbError::Serialize { .. }));
    }

    // Tests for From<DbError> for rmcp::ErrorData

    #[test]
    fn test_unknown_database_maps_to_resource_not_found() {
        let err = DbError::unknown_database("missing");
        let mcp_err: rmcp::ErrorData = err.into();
        // resource_not_found uses -32002 in rmcp
        assert_eq!(mcp_err.code.0, -32002);
        let data = mcp_err.data.unwrap();
        assert_eq!(data["database_id"], "missing");
    }

    #[test]
    fn test_config_maps_to_invalid_params() {
        let err = DbError::config("bad payload");
        let mcp_err: rmcp::ErrorData = err.into();
        // invalid_params uses -32602
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_engine_maps_to_internal_error() {
        let err = DbError::engine("connection reset");
        let mcp_err: rmcp::ErrorData = err.into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_schema_error_carries_object_in_data() {
        let err = DbError::schema("Table 'orders' not found", "orders");
        let mcp_err: rmcp::ErrorData = err.into();
        let data = mcp_err.data.unwrap();
        assert_eq!(data["object"], "orders");
    }
}
