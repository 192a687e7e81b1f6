//! MCP Server for Multi-Party Debates
//!
//! Coordinates debates between agent participants: each registers with an
//! opening response, waits until joins go quiet, then exchanges a fixed number
//! of rounds.
//!
//! # Usage
//!
//! ```bash
//! # Standard MCP mode (one client over stdio)
//! debate-coordination
//!
//! # Streamable HTTP, one MCP session per client
//! debate-coordination --transport http --bind 0.0.0.0:62887
//!
//! # Custom configuration
//! DEBATE_QUIET_PERIOD_MS=3000 debate-coordination --max-rounds 3 --inline-responses
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};

use debate_coordination::{
    Coordinator, DebateConfig, DebateServer, EventBus, SharedCoordinator, SubmitShape,
};

/// Default listen address for the HTTP transport
const DEFAULT_BIND: &str = "127.0.0.1:62887";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Transport to serve MCP over
    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// Listen address for the HTTP transport (overrides DEBATE_BIND)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Quiet period before registration closes (overrides DEBATE_QUIET_PERIOD_MS)
    #[arg(long)]
    quiet_period_ms: Option<u64>,

    /// Rounds per participant, including registration (overrides DEBATE_MAX_ROUNDS)
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Include all responses in every submit-response result
    #[arg(long, default_value_t = false)]
    inline_responses: bool,

    /// Put every participant in one session regardless of topic
    #[arg(long, default_value_t = false)]
    single_session: bool,
}

impl Args {
    fn debate_config(&self) -> DebateConfig {
        let mut config = DebateConfig::from_env();

        if let Some(ms) = self.quiet_period_ms {
            config = config.with_quiet_period(Duration::from_millis(ms));
        }
        if let Some(max) = self.max_rounds {
            config = config.with_max_rounds(max);
        }
        if self.inline_responses {
            config = config.with_submit_shape(SubmitShape::WithResponses);
        }
        if self.single_session {
            config = config.with_partition_by_topic(false);
        }

        config
    }

    fn bind_addr(&self) -> Result<SocketAddr> {
        if let Some(addr) = self.bind {
            return Ok(addr);
        }
        let raw = std::env::var("DEBATE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
        raw.parse()
            .with_context(|| format!("Invalid DEBATE_BIND address: {}", raw))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debate_coordination=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.debate_config();
    tracing::info!(
        "Debate config: quiet_period={}ms, max_rounds={}, submit_shape={}, partition_by_topic={}",
        config.quiet_period.as_millis(),
        config.max_rounds,
        config.submit_shape,
        config.partition_by_topic
    );

    let coordinator = Coordinator::new(config, EventBus::new().shared()).shared();

    match args.transport {
        Transport::Stdio => serve_stdio(coordinator).await,
        Transport::Http => serve_http(coordinator, args.bind_addr()?).await,
    }
}

async fn serve_stdio(coordinator: SharedCoordinator) -> Result<()> {
    tracing::info!("Starting Debate MCP Server on stdio");

    let transport = (stdin(), stdout());
    let service = DebateServer::new(coordinator).serve(transport).await?;

    service.waiting().await?;

    Ok(())
}

async fn serve_http(coordinator: SharedCoordinator, addr: SocketAddr) -> Result<()> {
    let service = StreamableHttpService::new(
        move || Ok(DebateServer::new(coordinator.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    let app = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Starting Debate MCP Server on http://{}/mcp", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
