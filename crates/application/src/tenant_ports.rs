use async_trait::async_trait;
use auditrail_core::{AppResult, TenantId};
use auditrail_domain::TenantDescriptor;

/// Source of truth for tenant identity.
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Loads a tenant by normalised subdomain.
    async fn load_by_subdomain(&self, subdomain: &str) -> AppResult<Option<TenantDescriptor>>;

    /// Loads a tenant by id.
    async fn load_by_id(&self, tenant_id: TenantId) -> AppResult<Option<TenantDescriptor>>;
}
