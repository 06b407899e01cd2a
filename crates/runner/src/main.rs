use std::sync::Arc;

use anyhow::Context;
use qxlink_gateway::{BrokerClient, load_config, load_default_config};
use qxlink_runner::StaticSessionProvider;
use qxlink_runner::provider::credentials_from_env;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("qxlink_gateway=info".parse()?))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path).with_context(|| format!("loading config from {}", path))?,
        None => load_default_config()?,
    };
    tracing::info!(host = %config.host, asset = %config.asset, demo = config.is_demo, "Starting qxlink");

    let provider = Arc::new(StaticSessionProvider::from_env());
    let client = BrokerClient::builder(config)
        .with_session_provider(provider, credentials_from_env())
        .build()?;

    client.connect().await.context("connecting to broker")?;

    match client.refresh_profile().await {
        Ok(profile) => tracing::info!(
            nick = ?profile.nick_name,
            currency = ?profile.currency_code(),
            minimum = ?profile.minimum_amount(),
            "Profile loaded"
        ),
        Err(e) => tracing::warn!(error = %e, "Could not load profile"),
    }
    if let Some(balance) = client.state().balance() {
        tracing::info!(live = ?balance.live, demo = ?balance.demo, "Balance");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    client.close().await;
    Ok(())
}
