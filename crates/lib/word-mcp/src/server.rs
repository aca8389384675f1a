//! MCP server runners for word-mcp.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use tracing::info;
use word_core::DocumentControl;

use crate::WordMcp;

pub const DEFAULT_MCP_PATH: &str = "/mcp";

/// Configuration for the MCP HTTP server.
#[derive(Debug, Clone)]
pub struct McpHttpServerConfig {
    pub addr: SocketAddr,
    /// Mount path of the MCP service; `/health` is always served beside it.
    pub path: String,
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
}

impl McpHttpServerConfig {
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            path: DEFAULT_MCP_PATH.to_string(),
            stateful_mode: true,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

impl Default for McpHttpServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8000)))
    }
}

/// Serves the MCP server over stdio.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio(
    control: Arc<DocumentControl>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service = WordMcp::with_control(control);
    let (stdin, stdout) = stdio();
    let running = serve_server(service, (stdin, stdout)).await?;
    let _ = running.waiting().await?;
    Ok(())
}

/// Builds the axum router: `/health` plus the streamable HTTP service at `config.path`.
pub fn http_router(control: Arc<DocumentControl>, config: &McpHttpServerConfig) -> Router {
    let service: StreamableHttpService<WordMcp, LocalSessionManager> = StreamableHttpService::new(
        move || Ok(WordMcp::with_control(control.clone())),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            sse_keep_alive: config.sse_keep_alive,
            sse_retry: config.sse_retry,
            stateful_mode: config.stateful_mode,
            ..Default::default()
        },
    );

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest_service(&config.path, service)
}

/// Serves the MCP server over HTTP until the listener fails.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve_http(
    control: Arc<DocumentControl>,
    config: McpHttpServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = http_router(control, &config);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, path = %config.path, "serving MCP over HTTP");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_listens_on_all_interfaces() {
        let config = McpHttpServerConfig::default();
        assert_eq!(config.addr.port(), 8000);
        assert!(config.addr.ip().is_unspecified());
        assert_eq!(config.path, DEFAULT_MCP_PATH);
        assert!(config.stateful_mode);
    }

    #[test]
    fn path_is_configurable() {
        let config = McpHttpServerConfig::default().with_path("/sse");
        assert_eq!(config.path, "/sse");
    }
}
