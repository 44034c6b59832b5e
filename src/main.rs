//! Multi-Database MCP Server - Main entry point.
//!
//! MCP (Model Context Protocol) server giving AI assistants query and
//! inspection tools over several SQL databases (PostgreSQL, MySQL,
//! SQLite) at once.

use clap::Parser;
use multidb_mcp_server::config::{Config, TransportMode};
use multidb_mcp_server::registry::DatabaseRegistry;
use multidb_mcp_server::session::SessionContext;
use multidb_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout stays reserved for the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Print the configuration help shown when startup fails.
fn print_usage() {
    eprintln!();
    eprintln!("Usage:");
    eprintln!("1. Single database via environment:");
    eprintln!(
        "   DB_TYPE=pg DB_CONFIG='{{\"host\":\"localhost\",\"user\":\"postgres\",\"password\":\"pass\",\"dbname\":\"mydb\"}}' multidb-mcp-server"
    );
    eprintln!("2. Multiple databases via environment:");
    eprintln!(
        "   DB_CONFIGS='[{{\"db_type\":\"pg\",\"configuration\":{{\"host\":\"localhost\"}},\"description\":\"My PostgreSQL DB\"}}]' multidb-mcp-server"
    );
    eprintln!("3. Single database via flags:");
    eprintln!(
        "   multidb-mcp-server --db-type mysql --db-config '{{\"host\":\"localhost\",\"port\":3306,\"user\":\"root\",\"password\":\"pass\",\"database\":\"test\"}}'"
    );
    eprintln!("4. Multiple databases via flags:");
    eprintln!(
        "   multidb-mcp-server --db-configs '[{{\"db_type\":\"sqlite\",\"configuration\":{{\"dbpath\":\"data.db\"}},\"description\":\"Local cache\",\"id\":\"cache\"}}]'"
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    // Resolve database definitions; misconfiguration is fatal
    let specs = match config.database_specs() {
        Ok(specs) => specs,
        Err(e) => {
            eprintln!("Error: {e}");
            print_usage();
            std::process::exit(1);
        }
    };

    info!(
        transport = %config.transport,
        databases = specs.len(),
        "Starting Multi-Database MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Connect every configured database; runner construction failures are
    // fatal, failed probes are logged and tolerated
    let registry = match DatabaseRegistry::connect(specs).await {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error initializing query runners: {e}");
            print_usage();
            std::process::exit(1);
        }
    };

    let ctx = Arc::new(SessionContext::new(registry));

    // Run the appropriate transport
    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(ctx);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                ctx,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
