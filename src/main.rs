//! CLI entry point launching a Vitalscope trace replay.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = vitalscope::config::CliArgs::parse();
    let config = vitalscope::config::AppConfig::load(cli.clone()).await?;

    if let Err(error) = vitalscope::run(config).await {
        tracing::error!(error = %error, "replay execution failed");
        return Err(error.into());
    }

    Ok(())
}
