use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod database;
mod error;
mod export;
mod extractor;
mod models;
mod orchestrator;
mod parser;
mod price_tracker;
mod reconciler;
mod sites;
mod traits;
mod transport;

use config::Config;
use price_tracker::PriceTracker;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting competitor price tracker");

    let config = Config::from_env()?;
    info!(
        "Competitors: {} | input: {}",
        config.competitors.join(", "),
        config.input_csv.display()
    );

    let tracker = PriceTracker::new(config).await?;
    tracker.run().await?;

    info!("Process completed successfully");
    Ok(())
}
