use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use annynotes::app::{app, AppState};
use annynotes::cli::Cli;
use annynotes::config::AppConfig;
use annynotes::database::SqliteStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load .env (or --env-file) before reading any configuration
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path).with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("annynotes=info,tower_http=info")),
        )
        .init();

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    cli.apply(&mut config);
    tracing::info!("Starting AnnyNotes in {:?} mode", config.environment);

    let storage = SqliteStorage::connect(&config.database)
        .await
        .context("failed to open database")?;
    let state = AppState::new(&config, Arc::new(storage.clone()));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("AnnyNotes listening on http://{}", bind_addr);

    axum::serve(listener, app(&config, state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    storage.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
