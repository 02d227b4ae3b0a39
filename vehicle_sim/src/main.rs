// src/main.rs
use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vehicle_sim::config::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // -------- logging ----------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("vehicle_sim=info".parse()?)
                .add_directive("link_protocol=info".parse()?)
                .add_directive("tokio=warn".parse()?),
        )
        .compact()
        .init();

    let cfg = Cli::parse_and_build_config()?;
    info!(?cfg, "vehicle simulator starting");

    let vehicle = vehicle_sim::spawn(cfg).await?;
    info!(addr = %vehicle.addr(), "running. Press Ctrl+C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(?e, "failed to install Ctrl+C handler");
    }
    info!(
        requests = vehicle.requests_seen(),
        control_frames = vehicle.control_frames(),
        "shutdown signal received; exiting."
    );
    vehicle.stop().await;
    Ok(())
}
