//! chatlandd - the ChatLand IRC server binary.

use chatland::config::Config;
use chatland::dispatch::Dispatcher;
use chatland::network::Gateway;
use chatland::state::Registry;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "chatland.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(server = %config.server.name, "Starting chatland");

    let registry = Arc::new(Registry::new(&config.server.name, &config.server.motd));

    // The single protocol-translation worker.
    tokio::spawn(Dispatcher::new(Arc::clone(&registry)).run());

    let gateway = Gateway::bind(&config, registry).await?;
    gateway.run().await?;

    Ok(())
}
