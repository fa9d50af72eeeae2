//! Sift Image Analyzer
//!
//! Stream worker symmetric to the text analyzer: consumes raw image uploads,
//! scores them against the NSFW categories, and re-emits scored messages for
//! the storage sink. The scored topic is what the storage service's image
//! consumer reads; nothing downstream ever sees an unscored image.

mod classifier;
mod config;
mod worker;

use anyhow::{Context, Result};
use classifier::HeuristicClassifier;
use config::Config;
use sift_pipeline::messages::IMAGE_FRAME_MAX_BYTES;
use sift_pipeline::{ContentConsumer, ContentProducer};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use worker::ScoringWorker;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "Starting sift image analyzer");

    init_metrics(config.service.metrics_port)?;

    let producer =
        Arc::new(ContentProducer::new(&config.kafka).context("Failed to create producer")?);

    let consumer = Arc::new(
        ContentConsumer::new(
            &config.kafka,
            &config.kafka.topics.image_uploads,
            IMAGE_FRAME_MAX_BYTES,
        )
        .context("Failed to create consumer")?
        .with_dead_letter_producer(producer.clone()),
    );

    let handler = Arc::new(ScoringWorker::new(
        HeuristicClassifier::new(),
        producer.clone(),
        config.kafka.topics.images.clone(),
    ));

    let worker_handle = tokio::spawn({
        let consumer = consumer.clone();
        async move {
            if let Err(e) = consumer.run(handler).await {
                error!(error = %e, "Scoring worker exited with error");
            }
        }
    });

    info!("Image analyzer started successfully");

    shutdown_signal().await;

    info!("Shutting down image analyzer");

    consumer.shutdown();
    let _ = worker_handle.await;

    info!("Image analyzer stopped");

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
