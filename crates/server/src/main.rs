use std::time::Duration;

use anyhow::{Context, Result};
use horizon_core::config::{AppConfig, LoadOptions};
use horizon_server::{bootstrap_with_config, build_app_router};
use tokio::net::TcpListener;

fn init_logging(config: &AppConfig) {
    use horizon_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging first so bootstrap failures are reported in the configured format.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let (config, state) = bootstrap_with_config(config).await?.into_state();
    let router = build_app_router(state.clone(), &config.server);

    let address = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener =
        TcpListener::bind(&address).await.with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(
        event_name = "server.started",
        address = %address,
        model = %state.runtime.model(),
        "horizon-server listening"
    );

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!(event_name = "server.stopping", "shutdown requested, draining connections");
    let _ = stop_tx.send(());

    let grace = Duration::from_secs(config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined.context("server task panicked")??,
        Err(_) => tracing::warn!(
            event_name = "server.shutdown_timeout",
            grace_secs = config.server.graceful_shutdown_secs,
            "connections still open after grace period"
        ),
    }

    state.db_pool.close().await;
    Ok(())
}
