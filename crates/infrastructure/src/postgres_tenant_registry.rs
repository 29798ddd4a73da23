use async_trait::async_trait;
use auditrail_application::TenantRegistry;
use auditrail_core::{AppError, AppResult, TenantId};
use auditrail_domain::{TenantDescriptor, normalize_subdomain};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// PostgreSQL-backed tenant registry over `master.tenants`.
#[derive(Clone)]
pub struct PostgresTenantRegistry {
    pool: PgPool,
}

impl PostgresTenantRegistry {
    /// Creates a registry with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TenantRow {
    id: Uuid,
    subdomain: String,
    schema_name: String,
    display_name: String,
    is_active: bool,
}

impl TryFrom<TenantRow> for TenantDescriptor {
    type Error = AppError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        TenantDescriptor::new(
            TenantId::from_uuid(row.id),
            row.subdomain,
            row.schema_name,
            row.display_name,
            row.is_active,
        )
    }
}

#[async_trait]
impl TenantRegistry for PostgresTenantRegistry {
    async fn load_by_subdomain(&self, subdomain: &str) -> AppResult<Option<TenantDescriptor>> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, subdomain, schema_name, display_name, is_active
            FROM master.tenants
            WHERE lower(subdomain) = $1
                AND deleted_at IS NULL
            "#,
        )
        .bind(normalize_subdomain(subdomain))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load tenant for subdomain '{subdomain}': {error}"
            ))
        })?;

        row.map(TenantDescriptor::try_from).transpose()
    }

    async fn load_by_id(&self, tenant_id: TenantId) -> AppResult<Option<TenantDescriptor>> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, subdomain, schema_name, display_name, is_active
            FROM master.tenants
            WHERE id = $1
                AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load tenant '{tenant_id}': {error}"))
        })?;

        row.map(TenantDescriptor::try_from).transpose()
    }
}
