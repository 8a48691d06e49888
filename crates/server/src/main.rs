//! mcp-idf-docs server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use idfdocs_client::{Explorer, FetchConfig, HttpFetcher};
use idfdocs_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let fetcher = HttpFetcher::new(FetchConfig::from(&config))?;
    let explorer = Explorer::from_config(&config, Arc::new(fetcher))?;

    tracing::info!(
        root = %explorer.root().root_url(),
        cache_capacity = config.cache_capacity,
        "Starting mcp-idf-docs server on stdio transport"
    );

    let handler = handler::DocsServer::new(Arc::new(explorer));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
