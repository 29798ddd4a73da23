use std::sync::Arc;

use auditrail_core::{ActorIdentity, AppError, TenantId, UserId};
use auditrail_domain::{
    AuditActionType, AuditCategory, AuditSeverity, Capability, ChangeOperation, TrackedChange,
    TrackedField,
};
use serde_json::json;

use crate::authorization_gate::{AuthorizationGate, denied_capabilities};
use crate::change_capture_service::{CapturePolicy, ChangeCaptureService};
use crate::request_context::NoRequestContext;
use crate::test_support::{GrantedCapabilities, RecordingSink};

use super::ChangeIngestionService;

fn service(granted: &[Capability]) -> (ChangeIngestionService, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let policy = CapturePolicy::standard().unwrap_or_else(|_| unreachable!());
    let capture =
        ChangeCaptureService::new(Arc::new(policy), sink.clone(), Arc::new(NoRequestContext));
    let gate = AuthorizationGate::new(
        Arc::new(GrantedCapabilities::of(granted)),
        sink.clone(),
        Arc::new(NoRequestContext),
    );
    (ChangeIngestionService::new(capture, gate), sink)
}

fn salary_change(tenant_id: Option<TenantId>) -> TrackedChange {
    TrackedChange {
        entity_kind: "Employee".to_owned(),
        entity_id: Some("emp-7".to_owned()),
        tenant_id,
        operation: ChangeOperation::Updated,
        fields: vec![TrackedField {
            name: "Salary".to_owned(),
            original: Some(json!(5000)),
            current: Some(json!(5200)),
            is_modified: true,
            is_foreign_key: false,
        }],
    }
}

fn reporter(tenant_id: Option<TenantId>) -> ActorIdentity {
    ActorIdentity::new(
        UserId::new(),
        Some("sync@acme.test".to_owned()),
        Some("Integration".to_owned()),
        tenant_id,
    )
}

#[tokio::test]
async fn reporter_without_capability_is_denied_with_one_security_record() {
    let (service, sink) = service(&[Capability::AuditRead]);
    let tenant_id = TenantId::new();

    let result = service
        .ingest(&reporter(Some(tenant_id)), vec![salary_change(None)])
        .await;

    let error = result.err().unwrap_or_else(|| unreachable!());
    assert!(matches!(error, AppError::Forbidden(_)));
    assert_eq!(
        denied_capabilities(&error),
        Some(vec!["audit.ingest".to_owned(), "audit.admin".to_owned()])
    );

    let records = sink.records.lock();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action(), AuditActionType::PermissionDenied);
    assert_eq!(records[0].category(), AuditCategory::Security);
    assert_eq!(records[0].severity(), AuditSeverity::Warning);
    assert_eq!(records[0].subject_id(), Some("audit.changes.ingest"));
}

#[tokio::test]
async fn ingest_capability_captures_changes_for_own_tenant() {
    let (service, sink) = service(&[Capability::AuditIngest]);
    let tenant_id = TenantId::new();

    let captured = service
        .ingest(&reporter(Some(tenant_id)), vec![salary_change(None)])
        .await;

    assert!(matches!(captured, Ok(1)));
    let records = sink.records.lock();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].category(), AuditCategory::DataChange);
    assert_eq!(records[0].tenant_id(), Some(tenant_id));
}

#[tokio::test]
async fn tenant_reporter_cannot_report_for_another_tenant() {
    let (service, sink) = service(&[Capability::AuditAdmin]);

    let result = service
        .ingest(
            &reporter(Some(TenantId::new())),
            vec![salary_change(Some(TenantId::new()))],
        )
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert!(sink.records.lock().is_empty());
}

#[tokio::test]
async fn platform_reporter_keeps_requested_tenant() {
    let (service, sink) = service(&[Capability::AuditAdmin]);
    let tenant_id = TenantId::new();

    let captured = service
        .ingest(&reporter(None), vec![salary_change(Some(tenant_id))])
        .await;

    assert!(matches!(captured, Ok(1)));
    assert_eq!(sink.records.lock()[0].tenant_id(), Some(tenant_id));
}
