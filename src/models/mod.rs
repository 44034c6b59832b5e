//! Data models for the multi-database MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

// Re-export commonly used types
pub use query::{HistoryEntry, ResultColumn, ResultSet};
pub use schema::{ColumnSchema, DatabaseType, TableSchema, is_safe_identifier};
