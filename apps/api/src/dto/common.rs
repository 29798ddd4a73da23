use serde::Serialize;

/// Status of one health dependency.
#[derive(Debug, Serialize)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: HealthDependencyStatus,
    pub audit_dispatch: HealthDependencyStatus,
    pub schema_isolation_policy: &'static str,
    pub schema_isolation_violations: u64,
}

/// Tenant cache state after an invalidation hook.
#[derive(Debug, Serialize)]
pub struct TenantCacheResponse {
    pub cached_tenants: usize,
}
