use std::sync::Arc;

use auditrail_application::{
    AlertRules, AnomalyDetectionService, AnomalyRules, AuditDispatcher, AuditEventConsumer,
    AuditEventSink, AuditPersistenceConsumer, AuditPipeline, SecurityAlertService,
};
use auditrail_core::AppResult;
use auditrail_infrastructure::{PostgresAuditLogRepository, PostgresSecurityFindingRepository};
use sqlx::PgPool;
use tracing::info;

use crate::api_config::ApiConfig;

pub(super) struct AuditPipelineHandles {
    pub dispatcher: Arc<AuditDispatcher>,
    pub sink: Arc<dyn AuditEventSink>,
}

pub(super) fn start_audit_pipeline(
    pool: &PgPool,
    fallback_pool: PgPool,
    config: &ApiConfig,
) -> AppResult<AuditPipelineHandles> {
    let findings = Arc::new(PostgresSecurityFindingRepository::new(pool.clone()));
    let consumers: Vec<Arc<dyn AuditEventConsumer>> = vec![
        Arc::new(AuditPersistenceConsumer::new(Arc::new(
            PostgresAuditLogRepository::new(pool.clone()),
        ))),
        Arc::new(AnomalyDetectionService::new(
            findings.clone(),
            AnomalyRules::default(),
        )),
        Arc::new(SecurityAlertService::new(findings, AlertRules::default())),
    ];

    let dispatcher = Arc::new(AuditDispatcher::new(config.dispatch));
    dispatcher.start(consumers)?;
    info!(
        persistence_workers = config.dispatch.persistence.workers,
        anomaly_workers = config.dispatch.anomaly_evaluation.workers,
        alert_workers = config.dispatch.security_alerting.workers,
        "audit dispatch started"
    );

    let sink: Arc<dyn AuditEventSink> = Arc::new(AuditPipeline::new(
        dispatcher.clone(),
        Arc::new(PostgresAuditLogRepository::new(fallback_pool)),
        config.fallback,
    ));

    Ok(AuditPipelineHandles { dispatcher, sink })
}
