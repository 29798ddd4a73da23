//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_statistics_cache;
mod postgres_audit_log_repository;
mod postgres_permission_lookup;
mod postgres_security_finding_repository;
mod postgres_statement_executor;
mod postgres_tenant_registry;

pub use in_memory_audit_statistics_cache::InMemoryAuditStatisticsCache;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_permission_lookup::PostgresPermissionLookup;
pub use postgres_security_finding_repository::PostgresSecurityFindingRepository;
pub use postgres_statement_executor::PostgresStatementExecutor;
pub use postgres_tenant_registry::PostgresTenantRegistry;
