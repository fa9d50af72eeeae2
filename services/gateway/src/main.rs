//! Sift API Gateway
//!
//! HTTP ingress for the moderation pipeline. Admits user submissions behind
//! a token-validating auth gate, pre-registers each content id with the
//! storage service over gRPC, and fans the payload out to the analyzer
//! topics. Reads come back through the storage service's read facade.

mod auth_client;
mod auth_handlers;
mod config;
mod content_handlers;
mod error;
mod middleware;
mod router;
mod state;
mod storage_client;

use anyhow::{Context, Result};
use auth_client::AuthClient;
use config::Config;
use sift_pipeline::ContentProducer;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use storage_client::StorageClient;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    init_tracing(&config.service.log_level, &config.env);

    info!(
        service = %config.service.name,
        env = %config.env,
        "Starting sift gateway"
    );

    init_metrics(config.service.metrics_port)?;

    let auth = AuthClient::connect(&config.auth).context("Failed to create auth client")?;
    let storage =
        StorageClient::connect(&config.storage).context("Failed to create storage client")?;
    let producer =
        Arc::new(ContentProducer::new(&config.kafka).context("Failed to create producer")?);

    let app_state = AppState {
        auth,
        storage,
        producer,
        topics: config.kafka.topics.clone(),
    };

    let router = router::build_router(app_state).layer(tower_http::timeout::TimeoutLayer::new(
        Duration::from_secs(config.http.write_timeout_secs),
    ));

    let addr = format!("0.0.0.0:{}", config.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(address = %addr, "HTTP server listening");

    let (drain_tx, drain_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = drain_rx.await;
            })
            .await
    });

    shutdown_signal().await;

    info!("Shutting down gateway");
    let _ = drain_tx.send(());

    // Give in-flight requests a bounded window to finish
    let drain = Duration::from_secs(config.http.shutdown_timeout_secs);
    match tokio::time::timeout(drain, server).await {
        Ok(result) => {
            result.context("HTTP server task panicked")??;
        }
        Err(_) => {
            warn!(drain_secs = drain.as_secs(), "Drain window elapsed with requests still in flight");
        }
    }

    info!("Gateway stopped");

    Ok(())
}

/// Initialize tracing/logging; pretty output locally, JSON everywhere else
fn init_tracing(log_level: &str, env: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if env == "local" {
        registry.with(fmt::layer().pretty()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }
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
