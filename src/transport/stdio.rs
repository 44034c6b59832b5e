//! Stdio transport for the MCP server.
//!
//! Speaks the protocol over standard input/output, the usual mode for
//! desktop assistant clients that spawn the server as a child process.

use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::session::SessionContext;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Stdio transport.
///
/// Reads JSON-RPC messages from stdin and writes responses to stdout.
/// Logging must stay on stderr for this to work, `main` sets that up.
pub struct StdioTransport {
    ctx: Arc<SessionContext>,
}

impl StdioTransport {
    /// Create a new stdio transport over the shared session context.
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = DbService::new(self.ctx.clone());
        let running = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::transport(format!("Failed to start stdio transport: {e}")))?;

        let mut signalled = false;
        tokio::select! {
            result = running.waiting() => {
                if let Err(e) = result {
                    warn!(error = %e, "Stdio transport error");
                    return Err(DbError::transport(format!("Stdio transport error: {e}")));
                }
                info!("Stdio transport completed normally");
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                signalled = true;
                // A second signal skips the connection cleanup below
                tokio::spawn(async {
                    wait_for_signal().await;
                    warn!("Received second signal, forcing immediate exit");
                    std::process::exit(1);
                });
            }
        }

        info!("Closing all database connections");
        self.ctx.registry().close_all().await;

        if signalled {
            // tokio::select! cannot interrupt a blocking stdin read, so the
            // process would otherwise hang on the open stdin stream
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DatabaseRegistry;

    #[test]
    fn test_stdio_transport_creation() {
        let registry = DatabaseRegistry::from_databases(Vec::new());
        let ctx = Arc::new(SessionContext::new(registry));
        let transport = StdioTransport::new(ctx);
        assert_eq!(transport.name(), "stdio");
    }
}
