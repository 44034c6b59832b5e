//! Multi-Database MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools, resources,
//! and prompts for AI assistants to query multiple SQL databases
//! (PostgreSQL, MySQL, SQLite) through one server.

pub mod config;
pub mod error;
pub mod mcp;
pub mod models;
pub mod registry;
pub mod runner;
pub mod session;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{DbError, DbResult};
pub use mcp::DbService;
