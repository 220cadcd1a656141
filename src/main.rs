//! wikidb service entry point.
//!
//! Loads configuration, deploys the page service on the message bus, and
//! runs until Ctrl-C.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use wikidb::bus::MessageBus;
use wikidb::config::ServiceConfig;
use wikidb::service::PageService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; LOG_FORMAT=json switches to structured output
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = ServiceConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        queue = %config.queue,
        max_pool_size = config.max_pool_size,
        "starting wikidb"
    );

    let bus = MessageBus::new(config.bus_capacity);
    let deployment = PageService::deploy(&config, &bus)
        .await
        .context("page service failed to start")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutdown requested");

    deployment.shutdown().await;
    Ok(())
}
