//! Sift Storage Service
//!
//! Owns all persistent state for the moderation pipeline: the content
//! header/payload tables in Postgres, the image objects in S3 and the
//! advisory Redis cache. Terminates the pipeline by consuming analyzer
//! results from Kafka, and serves reads/registrations to the gateway over
//! gRPC.

mod config;
mod content_repo;
mod grpc_server;
mod image_store;
mod kafka_sink;
mod models;
mod redis_cache;
mod usecase;

use anyhow::{Context, Result};
use config::Config;
use content_repo::ContentRepository;
use image_store::ImageStore;
use kafka_sink::{ImageSink, TextSink};
use redis_cache::ContentCache;
use sift_pipeline::messages::{IMAGE_FRAME_MAX_BYTES, TEXT_FRAME_MAX_BYTES};
use sift_pipeline::{ContentConsumer, ContentProducer};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use usecase::StorageUsecase;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "Starting sift storage service");

    init_metrics(config.service.metrics_port)?;

    let repo = ContentRepository::new(&config.repo)
        .await
        .context("Failed to initialize content repository")?;

    if config.repo.run_migrations {
        repo.run_migrations()
            .await
            .context("Failed to run database migrations")?;
    }

    let cache = ContentCache::connect(&config.cache)
        .await
        .context("Failed to initialize cache")?;

    let images = ImageStore::new(&config.s3)
        .await
        .context("Failed to initialize image store")?;
    images
        .ensure_bucket()
        .await
        .context("Failed to ensure bucket exists")?;

    let usecase = Arc::new(StorageUsecase::new(repo, cache, images));

    let dead_letter = Arc::new(
        ContentProducer::new(&config.kafka).context("Failed to create dead-letter producer")?,
    );

    let text_consumer = Arc::new(
        ContentConsumer::new(
            &config.kafka,
            &config.kafka.topics.text_results,
            TEXT_FRAME_MAX_BYTES,
        )
        .context("Failed to create text results consumer")?
        .with_dead_letter_producer(dead_letter.clone()),
    );

    let image_consumer = Arc::new(
        ContentConsumer::new(
            &config.kafka,
            &config.kafka.topics.images,
            IMAGE_FRAME_MAX_BYTES,
        )
        .context("Failed to create images consumer")?
        .with_dead_letter_producer(dead_letter.clone()),
    );

    let text_handle = tokio::spawn({
        let consumer = text_consumer.clone();
        let handler = Arc::new(TextSink::new(usecase.clone()));
        async move {
            if let Err(e) = consumer.run(handler).await {
                error!(error = %e, "Text sink exited with error");
            }
        }
    });

    let image_handle = tokio::spawn({
        let consumer = image_consumer.clone();
        let handler = Arc::new(ImageSink::new(usecase.clone()));
        async move {
            if let Err(e) = consumer.run(handler).await {
                error!(error = %e, "Image sink exited with error");
            }
        }
    });

    let grpc_handle = tokio::spawn({
        let usecase = usecase.clone();
        let port = config.grpc.port;
        async move {
            if let Err(e) = grpc_server::serve(usecase, port, shutdown_signal()).await {
                error!(error = %e, "gRPC server error");
            }
        }
    });

    info!("Storage service started successfully");

    shutdown_signal().await;

    info!("Shutting down storage service");

    text_consumer.shutdown();
    image_consumer.shutdown();

    let _ = text_handle.await;
    let _ = image_handle.await;
    let _ = grpc_handle.await;

    info!("Storage service stopped");

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
