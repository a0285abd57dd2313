//! Gmail Filters MCP Server
//!
//! A Model Context Protocol (MCP) server that manages Gmail labels and filters.

use anyhow::Context;
use clap::{Parser, Subcommand};

use gmail_filters_mcp_server::config::Config;
use gmail_filters_mcp_server::gmail::auth::Authenticator;
use gmail_filters_mcp_server::gmail::ClientAccessor;
use gmail_filters_mcp_server::mcp::catalog::build_catalog;
use gmail_filters_mcp_server::mcp::dispatch::Dispatcher;
use gmail_filters_mcp_server::mcp::server::McpServer;
use gmail_filters_mcp_server::mcp::types::ListToolsResult;

/// Gmail Filters MCP Server
#[derive(Parser)]
#[command(name = "gmail-filters-mcp-server")]
#[command(author, version, about = "Gmail Filters MCP Server - manage Gmail labels and filters over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize access to Gmail (run this first)
    Auth,

    /// Print the tool catalog as a tools/list payload
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Auth) => {
            let config = Config::new().context("Failed to load configuration")?;
            let authenticator = Authenticator::new(config)
                .await
                .context("Failed to load OAuth client keys")?;
            authenticator
                .authenticate_interactive()
                .await
                .context("Authorization failed")?;
            eprintln!("Authentication completed successfully!");
        }
        Some(Commands::Tools) => {
            let catalog = build_catalog()?;
            let listing = ListToolsResult {
                tools: catalog.list_tools(),
            };
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        None => {
            let config = Config::new().context("Failed to load configuration")?;
            run_server(config).await?;
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    if !config.oauth_keys_exist() {
        tracing::warn!(
            "OAuth keys not found at {}; tool calls will fail until they are in place",
            config.oauth_path.display()
        );
    }
    if !config.token_exists() {
        tracing::warn!("Not authorized yet. Run 'gmail-filters-mcp-server auth' first");
    }

    let catalog = build_catalog()?;
    tracing::info!("Serving {} tools over stdio", catalog.len());

    let dispatcher = Dispatcher::new(catalog, ClientAccessor::from_config(config));
    let server = McpServer::new(dispatcher);
    server.run_stdio().await.context("MCP server failed")?;

    Ok(())
}
