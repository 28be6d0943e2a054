use anyhow::Context;
use powerusage::{Aggregator, Config, Poller};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting power usage collector");
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Inverter meter `{}`, power meter `{}`",
        config.inverter_meter_url, config.power_meter_url
    );

    let aggregator = Arc::new(Aggregator::from_config(&config));
    let poller = Poller::new(aggregator, config.data_collection_interval).spawn();

    // capture exit signals so the poller is stopped cleanly
    let signal = shutdown_signal().await;
    info!("Got {signal} signal. Aborting...");
    poller.abort();

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return "interrupt";
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "interrupt",
        _ = terminate.recv() => "terminate",
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "interrupt"
}
