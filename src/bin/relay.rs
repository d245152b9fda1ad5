//! relay — HTTP relay in front of the marketplace REST API.
//!
//! Reads `relay.toml` when present (defaults otherwise), then applies
//! `RELAY_UPSTREAM_BASE` / `RELAY_BIND` from the environment or `.env`, then
//! command-line overrides.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use market_relay::config::{AppConfig, CONFIG_PATH};
use market_relay::relay::{RelayState, create_router};

#[derive(Parser)]
#[command(name = "relay", about = "JSON-normalizing HTTP relay for the marketplace API")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Listen address (overrides config and RELAY_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// Upstream base URL (overrides config and RELAY_UPSTREAM_BASE)
    #[arg(long)]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load_or_default(&args.config)?;
    config.apply_env();
    if let Some(bind) = args.bind {
        config.relay.bind = bind;
    }
    if let Some(upstream) = args.upstream {
        config.relay.upstream_base = upstream;
    }

    info!(
        "Starting relay — upstream={} timeout={}s soft_check={}ms ({})",
        config.relay.upstream_base,
        config.relay.request_timeout_secs,
        config.relay.soft_check_timeout_ms,
        config.relay.soft_check_prefix,
    );

    let bind = config.relay.bind.clone();
    let state = RelayState::new(config.relay)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("Relay listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
