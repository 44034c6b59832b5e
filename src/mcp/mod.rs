//! MCP server integration module.
//!
//! Binds the database tool handlers, schema resources, and prompt
//! templates to the MCP protocol using the rmcp framework.

pub mod prompts;
pub mod service;

pub use service::DbService;
