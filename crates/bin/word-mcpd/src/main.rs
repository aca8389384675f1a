//! Daemon entry point for the Word document MCP server.
//!
//! Loads configuration from CLI arguments and the environment, builds the
//! document control plane, and serves MCP over stdio or HTTP.

mod config;
mod registry;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use word_mcp::server::{McpHttpServerConfig, serve_http, serve_stdio};

use crate::config::{ServerConfig, Transport};
use crate::registry::{build_control, build_registry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = ServerConfig::from_args()?;
    init_tracing(&config);
    if let Some(value) = &config.rejected_transport {
        warn!(transport = %value, "unknown MCP_TRANSPORT, falling back to stdio");
    }

    let registry = build_registry(&config);
    let _sweeper = registry.clone().spawn_sweeper();
    let control = Arc::new(build_control(&config, registry));
    info!(
        root = %control.store().root().display(),
        author = control.default_author(),
        "document control ready"
    );

    match config.transport {
        Transport::Stdio => {
            info!("serving MCP over stdio");
            serve_stdio(control).await
        }
        Transport::StreamableHttp | Transport::Sse => {
            if config.transport == Transport::Sse {
                warn!(
                    path = config.http_path(),
                    "sse serves streamable HTTP; legacy SSE clients cannot connect"
                );
            }
            let http = McpHttpServerConfig::new(config.http_addr).with_path(config.http_path());
            serve_http(control, http).await
        }
    }
}

/// Logs go to stderr; stdout carries the stdio transport.
fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
