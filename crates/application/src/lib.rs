//! Application services and ports.
//!
//! Change capture, the audit dispatch pipeline and its consumers, schema
//! isolation checks, tenant resolution and the authorization gate. Storage and
//! transport live behind the ports declared here.

#![forbid(unsafe_code)]

mod anomaly_detection_service;
mod audit_log_service;
mod audit_ports;
mod audit_rules;
mod authorization_gate;
mod change_capture_service;
mod change_tracker;
mod event_dispatch;
mod request_context;
mod schema_isolation;
mod security_alert_service;
mod security_findings_service;
mod storage_ports;
mod tenant_ports;
mod tenant_resolution_cache;

#[cfg(test)]
mod test_support;

pub use anomaly_detection_service::{AnomalyDetectionService, AnomalyRules};
pub use audit_log_service::{
    AuditExport, AuditLogService, AuditRecordDetail, ExportFormat, INTEGRITY_PAGE_SIZE,
    IntegrityReport, MAX_EXPORT_RECORDS, MAX_PAGE_SIZE,
};
pub use audit_ports::{
    ActionCount, ActorActivity, AnomalyRepository, AnomalyType, AuditEventSink, AuditLogFilter,
    AuditLogPage, AuditLogQuery, AuditLogReadRepository, AuditRecordRepository, AuditStatistics,
    AuditStatisticsCache, AuditStatisticsFilter, DetectedAnomaly, FindingPage, SecurityAlert,
    SecurityAlertRepository, SecurityAlertType, SecurityFindingFilter, SecurityFindingQuery,
    SeverityCount,
};
pub use authorization_gate::{
    AuthorizationGate, PermissionLookup, ProtectedOperation, denied_capabilities,
};
pub use change_capture_service::{
    CapturePolicy, CapturedChanges, ChangeCaptureService, ChangeIngestionService,
    REDACTION_MARKER,
};
pub use change_tracker::{AuditableEntity, AuditedEntityStore, ChangeTracker};
pub use event_dispatch::{
    AuditDispatcher, AuditEventConsumer, AuditPersistenceConsumer, AuditPipeline, ConsumerRole,
    DispatchSettings, DispatchStats, FallbackSettings, QueuedEvent, RoleQueueSettings,
    RoleQueueStats, ShutdownReport, route_roles,
};
pub use request_context::{NoRequestContext, RequestContext, RequestContextSource};
pub use schema_isolation::{
    IsolationGuardedExecutor, IsolationPolicy, IsolationVerdict, STATEMENT_EXCERPT_CHARS,
    SchemaIsolationValidator, excerpt,
};
pub use security_alert_service::{AlertRules, SecurityAlertService};
pub use security_findings_service::SecurityFindingsService;
pub use storage_ports::{EntityStore, StatementExecutor};
pub use tenant_ports::TenantRegistry;
pub use tenant_resolution_cache::{DEFAULT_TENANT_CACHE_MAX_AGE, TenantResolutionCache};
