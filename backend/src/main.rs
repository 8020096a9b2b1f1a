//! Main entry point for the webar backend.
//!
//! This file initializes logging, loads and validates the configuration,
//! opens the document store, prepares the upload directory and the bootstrap
//! admin, and then serves the router built by [`backend::app`].

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use backend::config::Config;
use backend::database;
use backend::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,backend=debug,adapters=debug")),
        )
        .init();

    let config = Config::parse();
    config.validate().context("invalid configuration")?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("creating upload directory {}", config.upload_dir.display()))?;

    let addr = config.bind_addr();
    let admin = config.admin_email.clone().zip(config.admin_password.clone());
    let db = database::connect(&config.database_url)
        .await
        .context("opening document store")?;
    let state = AppState::build(config, db).context("building services")?;

    if let Some((email, password)) = admin {
        state
            .users
            .ensure_admin(&email, &password)
            .await
            .context("creating bootstrap admin")?;
    }

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "webar backend listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
