//! Game Store - server binary
//!
//! Serves the catalog and purchase API over HTTP.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use game_store::{StoreConfig, prepare_service, router};
use std::path::PathBuf;
use tracing::{info, instrument};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            host,
            port,
            database_url,
            referential_policy,
            no_seed,
        } => {
            let mut config = load_config(config, database_url, no_seed)?;
            if let Some(host) = host {
                config.set_host(host);
            }
            if let Some(port) = port {
                config.set_port(port);
            }
            if let Some(policy) = referential_policy {
                config.set_referential_policy(policy);
            }
            run_http_server(config).await
        }
        Command::InitDb {
            config,
            database_url,
            no_seed,
        } => {
            let config = load_config(config, database_url, no_seed)?;
            prepare_service(&config)?;
            info!(database_url = %config.database_url(), "Database initialized");
            Ok(())
        }
    }
}

/// Loads file and environment config, then applies shared CLI overrides.
#[instrument]
fn load_config(
    path: Option<PathBuf>,
    database_url: Option<String>,
    no_seed: bool,
) -> Result<StoreConfig> {
    let mut config = StoreConfig::load(path.as_deref())?;
    if let Some(url) = database_url {
        config.set_database_url(url);
    }
    if no_seed {
        config.set_seed_catalog(false);
    }
    Ok(config)
}

/// Run the HTTP store server until Ctrl+C.
#[instrument(skip(config))]
async fn run_http_server(config: StoreConfig) -> Result<()> {
    info!(
        database_url = %config.database_url(),
        policy = %config.referential_policy(),
        "Starting Game Store server"
    );

    let service = tokio::task::spawn_blocking({
        let config = config.clone();
        move || prepare_service(&config)
    })
    .await??;

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Server ready at http://{}/", config.bind_address());

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,game_store=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
