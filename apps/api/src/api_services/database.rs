use auditrail_core::AppError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::api_config::ApiConfig;

pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

/// Small pool reserved for fallback audit writes; never shared with request handling.
pub async fn connect_fallback_pool(config: &ApiConfig) -> Result<PgPool, AppError> {
    PgPoolOptions::new()
        .max_connections(config.fallback_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to connect audit fallback pool: {error}"))
        })
}
