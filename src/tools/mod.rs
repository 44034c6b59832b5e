//! Tool handlers behind the MCP surface.
//!
//! Each handler validates the database ID, delegates to the runner or the
//! session, and renders the outward string:
//! - `info`: database listings, info blocks, table search, query history
//! - `query`: execute_query and execute_query_json
//! - `inspect`: per-table columns, types, description, sample rows
//! - `schema`: full schema export as JSON
//!
//! Handlers return `DbResult<String>`; the service layer converts errors
//! into inline strings in exactly one place.

pub mod format;
pub mod info;
pub mod inspect;
pub mod query;
pub mod schema;

pub use info::{
    DatabaseInfoInput, FindTableInput, find_table, get_database_info, get_query_history,
    list_databases,
};
pub use inspect::{
    TableInput, TableSampleInput, describe_table, get_table_columns, get_table_sample,
    get_table_types,
};
pub use query::{ExecuteQueryInput, execute_query, execute_query_json};
pub use schema::{GetSchemaInput, get_schema};
