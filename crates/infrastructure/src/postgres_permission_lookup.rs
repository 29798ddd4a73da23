use async_trait::async_trait;
use auditrail_application::PermissionLookup;
use auditrail_core::{ActorIdentity, AppError, AppResult};
use auditrail_domain::Capability;
use sqlx::PgPool;

/// PostgreSQL-backed capability lookup over `master.actor_capabilities`.
///
/// Grants without a tenant apply platform-wide.
#[derive(Clone)]
pub struct PostgresPermissionLookup {
    pool: PgPool,
}

impl PostgresPermissionLookup {
    /// Creates a lookup with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionLookup for PostgresPermissionLookup {
    async fn has_permission(&self, actor: &ActorIdentity, capability: Capability) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM master.actor_capabilities
                WHERE actor_id = $1
                    AND capability = $2
                    AND (tenant_id IS NULL OR tenant_id = $3)
            )
            "#,
        )
        .bind(actor.user_id().as_uuid())
        .bind(capability.as_str())
        .bind(actor.tenant_id().map(|tenant_id| tenant_id.as_uuid()))
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to check capability '{capability}' for actor '{}': {error}",
                actor.user_id()
            ))
        })
    }
}
