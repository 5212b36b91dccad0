mod application;
mod config;
mod domain;
mod infrastructure;
mod interface;
mod metrics;
mod service;

use config::WriterConfig;
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

    let config = WriterConfig::from_env();
    info!("Starting Ripple Writer");

    ApplicationBootstrap::run(config).await
}
