//! HTTP transport for the MCP server.
//!
//! Serves the protocol over streamable HTTP with SSE responses,
//! for remote and web-based clients.

use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::session::SessionContext;
use crate::transport::{Transport, wait_for_signal};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// How long a graceful shutdown waits for open connections before the
/// server is dropped anyway.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport over axum.
///
/// Binds a TCP listener, mounts the MCP service at the configured
/// endpoint path, and keeps per-client state through the rmcp session
/// manager.
pub struct HttpTransport {
    ctx: Arc<SessionContext>,
    /// Bind host
    host: String,
    /// Bind port
    port: u16,
    /// Path the MCP service is mounted at, e.g. "/mcp"
    endpoint: String,
}

impl HttpTransport {
    /// Create an HTTP transport serving the shared session context.
    pub fn new(
        ctx: Arc<SessionContext>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            ctx,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    /// The host:port string the listener binds.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The path the MCP service is mounted at.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Mount the MCP service on an axum router at the configured path.
    /// Each HTTP session gets its own `DbService` over the same shared
    /// context.
    fn build_app(&self) -> axum::Router {
        let ctx = self.ctx.clone();
        let service = StreamableHttpService::new(
            move || Ok(DbService::new(ctx.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service rejects the root path, so "/" mounts as a fallback
        if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        }
    }
}

/// After the first shutdown signal, give connections a grace period.
/// A timeout or a second signal ends the wait and drops the server.
async fn shutdown_grace(notify: Arc<Notify>) {
    notify.notified().await;
    info!(
        timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
        "Waiting for connections to close (send signal again to force exit)..."
    );

    tokio::select! {
        _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
            warn!("Graceful shutdown timeout, forcing exit");
        }
        _ = wait_for_signal() => {
            warn!("Received second signal, forcing immediate exit");
        }
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting MCP server with HTTP transport on {}", bind_addr);

        let app = self.build_app();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| DbError::transport(format!("Failed to bind to {bind_addr}: {e}")))?;

        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        let shutdown = Arc::new(Notify::new());
        let signal_seen = shutdown.clone();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            wait_for_signal().await;
            signal_seen.notify_one();
        });

        // Open SSE streams can hold the server past the shutdown signal,
        // so the drain phase is raced against the grace watcher
        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!(error = %e, "HTTP server error");
                    return Err(DbError::transport(format!("HTTP server error: {e}")));
                }
                info!("HTTP server stopped");
            }
            _ = shutdown_grace(shutdown) => {}
        }

        info!("Closing all database connections");
        self.ctx.registry().close_all().await;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
