//! Analytics agent binary: HTTP server, Lambda runtime, or a single local query

use analytics_agent_api::{run_lambda, AgentServer};
use analytics_agent_common::AgentConfig;
use analytics_agent_history::cleanup_expired;
use analytics_agent_orchestrator::AnalyticsAgent;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "analytics-agent")]
#[command(version = "0.1.0")]
#[command(about = "Analytics agent over AgentCore Memory, Gateway and Identity")]
struct Cli {
    /// Path to configuration file; environment variables are used when it is missing
    #[arg(short, long, default_value = "config.dev.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Server {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the Lambda runtime API loop
    Lambda,
    /// Answer a single query locally and print the result
    Execute {
        /// The query to answer
        query: String,

        #[arg(long)]
        session_id: Option<String>,

        #[arg(long)]
        user_id: Option<String>,
    },
    /// Delete conversation records older than the retention window
    Cleanup {
        /// Retention in days; defaults to memory.retention_days
        #[arg(long)]
        days: Option<u32>,
    },
    /// Validate configuration
    ValidateConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.as_deref().unwrap_or("info");
    analytics_agent_common::init_tracing_with_level(log_level)?;

    info!("Analytics agent v0.1.0 starting");

    let mut config = AgentConfig::load_or_env(&cli.config).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    config.validate()?;

    match cli.command {
        Some(Commands::ValidateConfig) => {
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Gateway: {}", config.gateway.name);
            println!("  Memory resources: {}", config.memory.memory_ids().len());
            println!("  MCP tools: {}", config.mcp.available_tools.join(", "));
            Ok(())
        }
        Some(Commands::Execute { query, session_id, user_id }) => {
            let agent = AnalyticsAgent::from_config(config).await?;
            let text = agent
                .process_query(&query, session_id.as_deref(), user_id.as_deref())
                .await;
            println!("{}", text);
            Ok(())
        }
        Some(Commands::Cleanup { days }) => {
            let retention_days = days.unwrap_or(config.memory.retention_days);
            let agent = AnalyticsAgent::from_config(config).await?;
            let report = cleanup_expired(agent.services().conversations.as_ref(), retention_days).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Some(Commands::Lambda) => {
            let agent = Arc::new(AnalyticsAgent::from_config(config).await?);
            run_lambda(agent).await
        }
        Some(Commands::Server { host, port }) => {
            if let Some(h) = host {
                config.server.host = h;
            }
            if let Some(p) = port {
                config.server.port = p;
            }
            start_server(config).await
        }
        None => start_server(config).await,
    }
}

async fn start_server(config: AgentConfig) -> Result<()> {
    info!("Starting analytics agent on {}:{}", config.server.host, config.server.port);
    let server_config = config.server.clone();
    let agent = Arc::new(AnalyticsAgent::from_config(config).await?);
    AgentServer::new(agent, &server_config).run().await
}
