mod application;
mod config;
mod domain;
mod infrastructure;
mod interface;
mod metrics;
mod service;

use config::GatewayConfig;
use service::bootstrap::ApplicationBootstrap;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = GatewayConfig::from_env();
    info!("Starting Ripple Gateway");

    ApplicationBootstrap::run(config).await
}
