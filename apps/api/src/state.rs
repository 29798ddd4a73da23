use std::sync::Arc;

use auditrail_application::{
    AuditDispatcher, AuditLogService, AuthorizationGate, ChangeIngestionService,
    SchemaIsolationValidator, SecurityFindingsService, StatementExecutor, TenantResolutionCache,
};
use ipnet::IpNet;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub audit_log_service: AuditLogService,
    pub change_ingestion_service: ChangeIngestionService,
    pub security_findings_service: SecurityFindingsService,
    pub authorization_gate: AuthorizationGate,
    pub tenant_cache: Arc<TenantResolutionCache>,
    pub dispatcher: Arc<AuditDispatcher>,
    pub statement_executor: Arc<dyn StatementExecutor>,
    pub isolation_validator: Arc<SchemaIsolationValidator>,
    pub trusted_proxies: Arc<[IpNet]>,
}
