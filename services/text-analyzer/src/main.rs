//! Sift Text Analyzer
//!
//! Stream worker: consumes raw text uploads frame by frame, classifies each
//! one with the heuristic ruleset, and re-emits the verdict to the results
//! topic for the storage sink. Frames that cannot be decoded are
//! dead-lettered; a broken broker aborts the loop so the supervisor can
//! restart from the last committed offset.

mod analyzer;
mod config;
mod worker;

use analyzer::BasicAnalyzer;
use anyhow::{Context, Result};
use config::Config;
use sift_pipeline::messages::TEXT_FRAME_MAX_BYTES;
use sift_pipeline::{ContentConsumer, ContentProducer};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use worker::AnalyzerWorker;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "Starting sift text analyzer");

    init_metrics(config.service.metrics_port)?;

    let producer =
        Arc::new(ContentProducer::new(&config.kafka).context("Failed to create producer")?);

    let consumer = Arc::new(
        ContentConsumer::new(&config.kafka, &config.kafka.topics.text, TEXT_FRAME_MAX_BYTES)
            .context("Failed to create consumer")?
            .with_dead_letter_producer(producer.clone()),
    );

    let handler = Arc::new(AnalyzerWorker::new(
        BasicAnalyzer::new(),
        producer.clone(),
        config.kafka.topics.text_results.clone(),
    ));

    let worker_handle = tokio::spawn({
        let consumer = consumer.clone();
        async move {
            if let Err(e) = consumer.run(handler).await {
                error!(error = %e, "Analyzer worker exited with error");
            }
        }
    });

    info!("Text analyzer started successfully");

    shutdown_signal().await;

    info!("Shutting down text analyzer");

    consumer.shutdown();
    let _ = worker_handle.await;

    info!("Text analyzer stopped");

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
