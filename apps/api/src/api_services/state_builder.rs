use std::sync::Arc;

use auditrail_application::{
    AuditLogService, AuthorizationGate, CapturePolicy, ChangeCaptureService,
    ChangeIngestionService, IsolationGuardedExecutor, RequestContextSource,
    SchemaIsolationValidator, SecurityFindingsService, TenantResolutionCache,
};
use auditrail_core::AppError;
use auditrail_infrastructure::{
    InMemoryAuditStatisticsCache, PostgresAuditLogRepository, PostgresPermissionLookup,
    PostgresSecurityFindingRepository, PostgresStatementExecutor, PostgresTenantRegistry,
};
use sqlx::PgPool;
use tracing::info;

use crate::api_config::ApiConfig;
use crate::request_context::TaskLocalRequestContext;
use crate::state::AppState;

mod dispatch;

pub fn build_app_state(
    pool: PgPool,
    fallback_pool: PgPool,
    config: &ApiConfig,
) -> Result<AppState, AppError> {
    let request_context: Arc<dyn RequestContextSource> = Arc::new(TaskLocalRequestContext);
    let pipeline = dispatch::start_audit_pipeline(&pool, fallback_pool, config)?;

    let authorization_gate = AuthorizationGate::new(
        Arc::new(PostgresPermissionLookup::new(pool.clone())),
        pipeline.sink.clone(),
        request_context.clone(),
    );

    let audit_log_service = AuditLogService::new(
        Arc::new(PostgresAuditLogRepository::new(pool.clone())),
        Arc::new(InMemoryAuditStatisticsCache::new()),
        config.statistics_cache_ttl_seconds,
        authorization_gate.clone(),
        pipeline.sink.clone(),
    );

    let findings = Arc::new(PostgresSecurityFindingRepository::new(pool.clone()));
    let security_findings_service =
        SecurityFindingsService::new(findings.clone(), findings, authorization_gate.clone());

    let capture_policy = CapturePolicy::standard()?
        .with_extra_sensitive_fields(config.extra_sensitive_fields.iter());
    let change_capture_service = ChangeCaptureService::new(
        Arc::new(capture_policy),
        pipeline.sink,
        request_context,
    );
    let change_ingestion_service =
        ChangeIngestionService::new(change_capture_service, authorization_gate.clone());

    let isolation_validator = Arc::new(SchemaIsolationValidator::new(config.isolation_policy)?);
    let statement_executor = Arc::new(IsolationGuardedExecutor::new(
        Arc::new(PostgresStatementExecutor::new(pool.clone())),
        isolation_validator.clone(),
    ));
    info!(
        policy = config.isolation_policy.as_str(),
        "schema isolation validator enabled"
    );

    let tenant_cache = Arc::new(TenantResolutionCache::new(
        Arc::new(PostgresTenantRegistry::new(pool)),
        config.tenant_cache_max_age,
    ));

    Ok(AppState {
        audit_log_service,
        change_ingestion_service,
        security_findings_service,
        authorization_gate,
        tenant_cache,
        dispatcher: pipeline.dispatcher,
        statement_executor,
        isolation_validator,
        trusted_proxies: config.trusted_proxies.clone().into(),
    })
}
