//! Auditrail API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod request_context;
mod state;

use std::net::SocketAddr;

use auditrail_core::AppError;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let pool = api_services::connect_and_migrate(&config.database_url).await?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let fallback_pool = api_services::connect_fallback_pool(&config).await?;
    let app_state = api_services::build_app_state(pool, fallback_pool, &config)?;
    let dispatcher = app_state.dispatcher.clone();
    let integrity_task = api_services::spawn_integrity_checks(
        app_state.audit_log_service.clone(),
        config.integrity_check_interval,
    );

    let app = api_router::build_router(app_state);
    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "auditrail-api listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|error| AppError::Internal(format!("api server error: {error}")))?;

    if let Some(task) = integrity_task {
        task.abort();
    }

    let report = dispatcher.shutdown(config.shutdown_drain).await;
    if report.abandoned > 0 || report.timed_out {
        warn!(
            abandoned = report.abandoned,
            timed_out = report.timed_out,
            "audit dispatch stopped with undelivered events"
        );
    } else {
        info!("audit dispatch drained");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
