use anyhow::Result;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use prismchat_engine::{EngineConfig, api};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env()?;
    tracing::info!("starting PrismChat mock backend");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut api_handle = tokio::spawn(async move {
        if let Err(e) = api::start_server(config, shutdown_rx).await {
            tracing::error!(error = %e, "API server crashed");
        }
    });

    // Wait for Ctrl+C, unless the server dies first (e.g. the port is taken)
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("received shutdown signal");
            let _ = shutdown_tx.send(true);
            let _ = api_handle.await;
        }
        _ = &mut api_handle => {}
    }

    tracing::info!("PrismChat mock backend stopped, conversations discarded");
    Ok(())
}
