//! Wagerhouse daemon
//!
//! Loads configuration, assembles the platform and runs the Coaster engine
//! until interrupted, logging engine events as they happen.

use clap::Parser;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use wagerhouse::{
    coaster::CoasterEvent,
    config::{generate_sample_config, LoggingConfig},
    ConfigLoader, PlatformFactory, WagerResult,
};

#[derive(Parser)]
#[command(name = "wagerhouse")]
#[command(about = "Provably fair settlement core with a continuous leveraged price game")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "wagerhouse=debug"
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Write a sample configuration to this path and exit
    #[arg(long)]
    write_sample_config: Option<PathBuf>,
}

fn init_tracing(logging: &LoggingConfig, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter.clone().into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json || logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> WagerResult<()> {
    let cli = Cli::parse();

    if let Some(path) = cli.write_sample_config {
        generate_sample_config(&path.to_string_lossy())?;
        println!("Sample configuration written to {}", path.display());
        return Ok(());
    }

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(filter) = cli.log_level {
        config.logging.filter = filter;
    }
    init_tracing(&config.logging, cli.json_logs);

    let platform = PlatformFactory::build(config)?;
    let status = platform.coaster.status().await?;
    info!(
        round_id = %status.round_id,
        server_seed_hash = %status.server_seed_hash,
        price = status.price,
        enabled = status.enabled,
        "Wagerhouse started"
    );

    let mut events = platform.coaster.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            event = events.recv() => match event {
                Ok(CoasterEvent::Tick { tick_index, price, .. }) => {
                    tracing::debug!(tick_index, price, "Tick");
                }
                Ok(CoasterEvent::RoundStarted { round_id, server_seed_hash, .. }) => {
                    info!(%round_id, %server_seed_hash, "New Coaster round");
                }
                Ok(CoasterEvent::PositionBusted { position }) => {
                    info!(user_id = %position.user_id, position_id = %position.id, "Position busted");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event listener lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    platform.shutdown().await;
    Ok(())
}
