mod cli;
mod terminal;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use livedesk_core::{
    bootstrap::{init_services, load_config},
    logging,
};
use livedesk_fabric::BridgeClient;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load and validate configuration
    let config = load_config(cli.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("Livedesk starting...");

    // 3. Connect the fabric bridge
    let fabric = Arc::new(BridgeClient::new(&config.fabric)?);
    info!("Fabric bridge: {}", fabric.endpoint());

    // 4. Initialize services
    let services = init_services(&config, fabric);

    // 5. Populate the stream cache from the site listing
    match services.lifecycle.load_streams().await {
        Ok(count) => info!("Loaded {count} stream(s)"),
        Err(e) => warn!("Failed to load streams: {e}"),
    }

    cli::run(cli.command, &services, &config, cli.yes).await
}
