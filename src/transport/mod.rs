//! Transport selection for the MCP server.
//!
//! Two ways to serve the protocol: stdio for assistant clients that
//! spawn the server as a child process, and streamable HTTP for remote
//! clients. Both wrap the same `DbService`; the transport only decides
//! where the JSON-RPC bytes flow.

pub mod http;
pub mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use crate::error::DbResult;
use std::future::Future;
use tokio::signal;
use tracing::info;

/// Common interface over the ways the server can talk to a client.
///
/// A transport owns the connection lifecycle: `run` serves requests
/// until the client disconnects or a shutdown signal arrives, closing
/// database connections on the way out.
pub trait Transport: Send + Sync {
    /// Serve the MCP protocol until shutdown.
    fn run(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Short transport label for logs.
    fn name(&self) -> &'static str;
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub(crate) async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
