//! countdown — watch a market's betting window through the relay.
//!
//! Two poll loops run side by side: one refreshes the market object from the
//! relay, the other re-classifies it every tick and prints one JSON line per
//! tick to stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use market_relay::client::RelayClient;
use market_relay::config::{AppConfig, CONFIG_PATH};
use market_relay::countdown::{ClosedNotifier, classify};
use market_relay::poll::{LatestValue, PollLoop};
use market_relay::reporter;
use market_relay::types::{MarketWindow, StatusEvent, TimeWindow};

#[derive(Parser)]
#[command(name = "countdown", about = "Print a market's betting countdown via the relay")]
struct Args {
    /// Relay endpoint
    #[arg(long, default_value = "http://localhost:8080/relay")]
    relay_url: String,

    /// Logical upstream path of the market, e.g. /api/predictions/pool/<id>
    #[arg(long)]
    market_path: String,

    /// Path to the TOML config file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Exit once betting closes
    #[arg(long)]
    exit_on_close: bool,
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
    let config = AppConfig::load_or_default(&args.config)?;
    let policy = config.countdown.policy();

    let client = RelayClient::new(&args.relay_url, config.relay.request_timeout())?;
    let market: Arc<LatestValue<MarketWindow>> = Arc::new(LatestValue::new());
    let closed = Arc::new(Notify::new());

    info!(
        "Watching {} via {} (tick={}s refresh={}s)",
        args.market_path, args.relay_url, config.poll.tick_secs, config.poll.refresh_secs,
    );

    let refresh = {
        let market = market.clone();
        let path = args.market_path.clone();
        PollLoop::start(Duration::from_secs(config.poll.refresh_secs), move |seq| {
            let client = client.clone();
            let market = market.clone();
            let path = path.clone();
            async move {
                match client.fetch_market(&path).await {
                    Ok(window) => {
                        if !market.publish(seq, window) {
                            debug!("Discarded stale market refresh #{seq}");
                        }
                    }
                    Err(e) => warn!("Market refresh #{seq} failed: {e:#}"),
                }
            }
        })
    };

    let tick = {
        let market = market.clone();
        let path = args.market_path.clone();
        let on_closed = closed.clone();
        let mut notifier = ClosedNotifier::new(move || {
            info!("Betting closed");
            on_closed.notify_one();
        });
        PollLoop::start(Duration::from_secs(config.poll.tick_secs), move |seq| {
            if let Some(window) = market.get() {
                let now = chrono::Utc::now();
                let status = classify(&TimeWindow::from(&window), now.timestamp(), &policy);
                notifier.observe(&status);
                debug!("Tick #{seq}: {} ({})", status.state.label(), status.display_text);
                reporter::report_status(&StatusEvent {
                    timestamp: now.to_rfc3339(),
                    market: path.clone(),
                    seq,
                    status,
                });
            }
            std::future::ready(())
        })
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = closed.notified(), if args.exit_on_close => {
            info!("Market closed, exiting");
        }
    }

    tick.stop();
    refresh.stop();
    Ok(())
}
