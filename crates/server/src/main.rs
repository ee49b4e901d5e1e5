mod bootstrap;
mod health;
mod webhook;

use anyhow::Result;
use parley_core::config::{AppConfig, LoadOptions};
use tracing::{error, info};

fn init_logging(config: &AppConfig) {
    use parley_core::config::LogFormat::*;
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
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap(LoadOptions::default()).await?;

    let address = format!("{}:{}", app.config.webhook.bind_address, app.config.webhook.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        event_name = "system.server.webhook_listening",
        correlation_id = "bootstrap",
        bind_address = %address,
        "webhook and analytics endpoints started"
    );

    let routes = webhook::router(app.webhook_state.clone())
        .merge(health::router(app.claims.clone()));
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, routes).await {
            error!(
                event_name = "system.server.webhook_error",
                correlation_id = "bootstrap",
                error = %err,
                "webhook server terminated unexpectedly"
            );
        }
    });

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "parley-server started"
    );

    app.session_runner.start().await?;
    info!(
        event_name = "system.server.session_loop_finished",
        correlation_id = "bootstrap",
        "voice session loop finished"
    );

    wait_for_shutdown().await?;
    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "parley-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
