use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use auditrail_core::{ActorIdentity, AppError, AppResult, TenantId, UserId};
use auditrail_domain::{AuditActionType, AuditCategory, AuditSeverity, Capability};
use serde_json::json;

use crate::request_context::{NoRequestContext, RequestContext, RequestContextSource};
use crate::test_support::RecordingSink;

use super::{AuthorizationGate, PermissionLookup, ProtectedOperation, denied_capabilities};

struct FakePermissionLookup {
    granted: HashSet<(UserId, Capability)>,
    fail: bool,
}

#[async_trait]
impl PermissionLookup for FakePermissionLookup {
    async fn has_permission(&self, actor: &ActorIdentity, capability: Capability) -> AppResult<bool> {
        if self.fail {
            return Err(AppError::Internal("permission store unavailable".to_owned()));
        }
        Ok(self.granted.contains(&(actor.user_id(), capability)))
    }
}

struct RequestOnly;

impl RequestContextSource for RequestOnly {
    fn current(&self) -> Option<RequestContext> {
        Some(RequestContext {
            http_method: Some("GET".to_owned()),
            path: Some("/api/audit/export".to_owned()),
            ..RequestContext::default()
        })
    }
}

fn actor() -> ActorIdentity {
    ActorIdentity::new(
        UserId::new(),
        Some("analyst@acme.test".to_owned()),
        Some("Analyst".to_owned()),
        Some(TenantId::new()),
    )
}

fn gate(
    granted: HashSet<(UserId, Capability)>,
    context: Arc<dyn RequestContextSource>,
) -> (AuthorizationGate, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let gate = AuthorizationGate::new(
        Arc::new(FakePermissionLookup {
            granted,
            fail: false,
        }),
        sink.clone(),
        context,
    );
    (gate, sink)
}

fn export_operation() -> ProtectedOperation {
    ProtectedOperation::new(
        "audit.export",
        [Capability::AuditExport, Capability::AuditAdmin],
    )
}

#[tokio::test]
async fn holding_any_required_capability_grants_without_records() {
    let actor = actor();
    let (gate, sink) = gate(
        HashSet::from([(actor.user_id(), Capability::AuditAdmin)]),
        Arc::new(NoRequestContext),
    );

    let result = gate.authorize(&actor, &export_operation()).await;
    assert!(result.is_ok());
    assert!(sink.records.lock().is_empty());
}

#[tokio::test]
async fn missing_all_capabilities_denies_with_one_security_record() {
    let actor = actor();
    let (gate, sink) = gate(
        HashSet::from([(actor.user_id(), Capability::AuditRead)]),
        Arc::new(RequestOnly),
    );

    let result = gate.authorize(&actor, &export_operation()).await;
    assert!(matches!(result, Err(AppError::Forbidden(ref message)) if message.contains("audit.export")));

    let records = sink.records.lock();
    assert_eq!(records.len(), 1);
    let denial = &records[0];
    assert_eq!(denial.action(), AuditActionType::PermissionDenied);
    assert_eq!(denial.category(), AuditCategory::Security);
    assert_eq!(denial.severity(), AuditSeverity::Warning);
    assert_eq!(denial.actor_id(), Some(actor.user_id()));
    assert_eq!(denial.tenant_id(), actor.tenant_id());
    assert_eq!(
        denial.metadata().map(|metadata| metadata["required_capabilities"].clone()),
        Some(json!(["audit.export", "audit.admin"]))
    );
    assert_eq!(
        denial.metadata().map(|metadata| metadata["http_method"].clone()),
        Some(json!("GET"))
    );
    assert!(denial.verify_checksum());
}

#[tokio::test]
async fn lookup_failure_propagates_without_denial_record() {
    let sink = Arc::new(RecordingSink::default());
    let gate = AuthorizationGate::new(
        Arc::new(FakePermissionLookup {
            granted: HashSet::new(),
            fail: true,
        }),
        sink.clone(),
        Arc::new(NoRequestContext),
    );

    let result = gate.authorize(&actor(), &export_operation()).await;
    assert!(matches!(result, Err(AppError::Internal(_))));
    assert!(sink.records.lock().is_empty());
}

#[tokio::test]
async fn operations_without_requirements_are_open() {
    let (gate, sink) = gate(HashSet::new(), Arc::new(NoRequestContext));
    let result = gate
        .authorize(&actor(), &ProtectedOperation::new("health", Vec::<Capability>::new()))
        .await;

    assert!(result.is_ok());
    assert!(sink.records.lock().is_empty());
}

#[tokio::test]
async fn denial_error_lists_required_capabilities() {
    let (gate, _) = gate(HashSet::new(), Arc::new(NoRequestContext));
    let result = gate.authorize(&actor(), &export_operation()).await;

    let listed = result.err().as_ref().and_then(denied_capabilities);
    assert_eq!(
        listed,
        Some(vec!["audit.export".to_owned(), "audit.admin".to_owned()])
    );
    assert_eq!(
        denied_capabilities(&AppError::Forbidden("tenant suspended".to_owned())),
        None
    );
}
