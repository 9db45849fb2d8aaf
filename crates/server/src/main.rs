mod bootstrap;
mod health;

use std::time::Duration;

use anyhow::Result;
use waiter_core::config::{AppConfig, LoadOptions};

use crate::health::HealthState;

fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use waiter_core::config::LogFormat::*;

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
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let health_task = health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        HealthState { catalog: app.catalog.clone(), sessions: app.sessions.clone() },
        async move {
            let _ = shutdown_rx.await;
        },
    )
    .await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        products = app.catalog.len(),
        "waiter-server started"
    );

    let graceful = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    tokio::select! {
        result = app.runner.start() => {
            if let Err(error) = result {
                tracing::warn!(
                    event_name = "system.server.runner_failed",
                    correlation_id = "shutdown",
                    error = %error,
                    "polling runner stopped with an error"
                );
            }
            tracing::warn!(
                event_name = "system.server.runner_stopped",
                correlation_id = "shutdown",
                "polling stopped; health endpoint stays up until shutdown"
            );
            wait_for_shutdown().await?;
        }
        signal = wait_for_shutdown() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        sessions = app.sessions.len(),
        "waiter-server stopping"
    );
    let _ = shutdown_tx.send(());
    if tokio::time::timeout(graceful, health_task).await.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            graceful_shutdown_secs = graceful.as_secs(),
            "health endpoint did not stop in time"
        );
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
