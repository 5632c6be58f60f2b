//! Keygate API Server
//!
//! REST API server for user registration and authentication.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use keygate_api::auth::{PasswordConfig, TokenCodec};
use keygate_api::{create_router, state::AppState, telemetry};
use keygate_cache::build_token_cache;
use keygate_core::config::{AppConfig, StoreBackend};
use keygate_core::{
    MemoryUserDirectory, PgUserDirectory, PhotoPublisher, SystemClock, UserDirectory,
};
use std::sync::Arc;

async fn build_directory(config: &AppConfig) -> anyhow::Result<Arc<dyn UserDirectory>> {
    match config.database.backend {
        StoreBackend::Postgres => {
            let directory = PgUserDirectory::connect(
                &config.database.postgres_url,
                config.database.pool_size,
            )
            .await?;
            directory.migrate().await?;
            Ok(Arc::new(directory))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory user directory; identities are lost on restart");
            Ok(Arc::new(MemoryUserDirectory::new()))
        }
    }
}

#[cfg(feature = "kafka")]
fn build_publisher(config: &AppConfig) -> anyhow::Result<Arc<dyn PhotoPublisher>> {
    Ok(Arc::new(keygate_api::photo::kafka::KafkaPublisher::new(
        &config.photo.kafka_brokers,
    )?))
}

#[cfg(not(feature = "kafka"))]
fn build_publisher(_config: &AppConfig) -> anyhow::Result<Arc<dyn PhotoPublisher>> {
    Ok(Arc::new(keygate_api::photo::LogPublisher))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    let telemetry = telemetry::init_tracing(&config.logging, &config.tracing)?;

    let directory = build_directory(&config).await?;
    let cache = build_token_cache(&config.cache).await?;
    let codec = TokenCodec::from_settings(&config.jwt, Arc::new(SystemClock))
        .context("failed to load signing keys")?;
    let password_config = PasswordConfig::from_settings(&config.password)?;
    let publisher = build_publisher(&config)?;

    tokio::fs::create_dir_all(&config.photo.storage_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create photo directory {}",
                config.photo.storage_dir.display()
            )
        })?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(
        config,
        directory,
        cache,
        codec,
        password_config,
        publisher,
    )?);

    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Keygate API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    let served = axum::serve(listener, app).await;

    // Flushing blocks on the exporter thread
    tokio::task::spawn_blocking(move || telemetry.shutdown()).await?;

    Ok(served?)
}
