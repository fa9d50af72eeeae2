//! Sift Auth Service
//!
//! Credential store and token lifecycle: bcrypt-hashed passwords in
//! Postgres, HS256 access/refresh tokens signed with the key from the
//! `SECRET_KEY` environment variable. Serves the gateway over gRPC.

mod config;
mod grpc_server;
mod models;
mod tokens;
mod usecase;
mod user_repo;

use anyhow::{Context, Result};
use config::Config;
use std::sync::Arc;
use tokens::TokenSigner;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use usecase::AuthUsecase;
use user_repo::UserRepository;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "Starting sift auth service");

    // A missing signing key is a deployment error, not something to limp past
    let secret_key = std::env::var("SECRET_KEY").context("SECRET_KEY must be set")?;
    if secret_key.is_empty() {
        anyhow::bail!("SECRET_KEY must not be empty");
    }

    init_metrics(config.service.metrics_port)?;

    let users = UserRepository::new(&config.database.dsn, config.database.max_connections)
        .await
        .context("Failed to initialize user repository")?;

    if config.database.run_migrations {
        users
            .run_migrations()
            .await
            .context("Failed to run database migrations")?;
    }

    let signer = TokenSigner::new(
        &secret_key,
        config.token.token_ttl_secs,
        config.token.refresh_token_ttl_secs,
    );

    let usecase = Arc::new(AuthUsecase::new(users, signer));

    info!("Auth service started successfully");

    grpc_server::serve(usecase, config.grpc.port, shutdown_signal()).await?;

    info!("Auth service stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
