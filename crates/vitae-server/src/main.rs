//! # Vitae Server
//!
//! Main entry point for the Vitae session layer.

use anyhow::Context;
use tracing::{error, info};
use vitae_config::ConfigLoader;
use vitae_core::telemetry::{init_tracing, LogFormat};
use vitae_server::{
    startup::{print_banner, print_startup_info},
    Application,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {:#}", e);
        eprintln!("Application error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let loader = ConfigLoader::from_default_location().context("failed to load configuration")?;
    let config = loader.get().await;

    init_tracing(
        &config.observability.log_level,
        LogFormat::parse(&config.observability.log_format),
    );

    print_banner();
    info!("Starting Vitae server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let app = Application::build(config.clone())
        .await
        .context("failed to build application")?;

    print_startup_info(&config);
    info!("Listening on http://{}", app.local_addr()?);

    app.run().await?;

    info!("Server shutdown complete");
    Ok(())
}
