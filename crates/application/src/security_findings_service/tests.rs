use std::sync::Arc;

use auditrail_core::{ActorIdentity, AppError, TenantId, UserId};
use auditrail_domain::{AuditActionType, AuditSeverity, Capability};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::audit_ports::{
    AnomalyType, DetectedAnomaly, SecurityAlert, SecurityAlertType, SecurityFindingFilter,
    SeverityCount,
};
use crate::authorization_gate::AuthorizationGate;
use crate::request_context::NoRequestContext;
use crate::test_support::{FakeSecurityFindingRepository, GrantedCapabilities, RecordingSink};

use super::SecurityFindingsService;

struct Fixture {
    service: SecurityFindingsService,
    repository: Arc<FakeSecurityFindingRepository>,
    sink: Arc<RecordingSink>,
}

fn fixture(granted: &[Capability]) -> Fixture {
    let repository = Arc::new(FakeSecurityFindingRepository::default());
    let sink = Arc::new(RecordingSink::default());
    let gate = AuthorizationGate::new(
        Arc::new(GrantedCapabilities::of(granted)),
        sink.clone(),
        Arc::new(NoRequestContext),
    );
    Fixture {
        service: SecurityFindingsService::new(repository.clone(), repository.clone(), gate),
        repository,
        sink,
    }
}

fn actor(tenant_id: Option<TenantId>) -> ActorIdentity {
    ActorIdentity::new(
        UserId::new(),
        Some("auditor@acme.test".to_owned()),
        Some("Auditor".to_owned()),
        tenant_id,
    )
}

fn alert(tenant_id: TenantId, severity: AuditSeverity, minutes_ago: i64) -> SecurityAlert {
    SecurityAlert {
        id: Uuid::new_v4(),
        created_at: Utc::now() - Duration::minutes(minutes_ago),
        tenant_id: Some(tenant_id),
        actor_id: Some(UserId::new()),
        actor_email: Some("clerk@acme.test".to_owned()),
        alert_type: SecurityAlertType::UnauthorizedAccess,
        severity,
        risk_score: 40,
        title: "Unauthorized access attempt".to_owned(),
        description: "export denied".to_owned(),
        audit_record_id: Uuid::new_v4(),
        ip_address: None,
    }
}

fn anomaly(tenant_id: TenantId, severity: AuditSeverity) -> DetectedAnomaly {
    DetectedAnomaly {
        id: Uuid::new_v4(),
        detected_at: Utc::now(),
        tenant_id: Some(tenant_id),
        actor_id: Some(UserId::new()),
        actor_email: None,
        anomaly_type: AnomalyType::MassDataExport,
        severity,
        risk_score: 70,
        description: "exported 250 records".to_owned(),
        evidence: json!({ "record_count": 250 }),
        audit_record_id: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn tenant_actor_lists_only_own_alerts_newest_first() {
    let fixture = fixture(&[Capability::AuditRead]);
    let own = TenantId::new();
    let other = TenantId::new();
    {
        let mut alerts = fixture.repository.alerts.lock().await;
        alerts.push(alert(own, AuditSeverity::Warning, 30));
        alerts.push(alert(other, AuditSeverity::Critical, 5));
        alerts.push(alert(own, AuditSeverity::Critical, 1));
    }

    let page = fixture
        .service
        .list_alerts(&actor(Some(own)), SecurityFindingFilter::default(), 1, 50)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(page.total, 2);
    assert_eq!((page.page, page.page_size), (1, 50));
    assert!(page.items.iter().all(|item| item.tenant_id == Some(own)));
    assert_eq!(page.items[0].severity, AuditSeverity::Critical);
}

#[tokio::test]
async fn tenant_actor_cannot_filter_on_another_tenant() {
    let fixture = fixture(&[Capability::AuditAdmin]);
    let filter = SecurityFindingFilter {
        tenant_id: Some(TenantId::new()),
        ..SecurityFindingFilter::default()
    };

    let result = fixture
        .service
        .list_anomalies(&actor(Some(TenantId::new())), filter, 1, 10)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn findings_of_another_tenant_are_not_found() {
    let fixture = fixture(&[Capability::AuditRead]);
    let foreign = alert(TenantId::new(), AuditSeverity::Warning, 0);
    let foreign_id = foreign.id;
    fixture.repository.alerts.lock().await.push(foreign);

    let hidden = fixture
        .service
        .find_alert(&actor(Some(TenantId::new())), foreign_id)
        .await;
    assert!(matches!(hidden, Err(AppError::NotFound(_))));

    let visible = fixture.service.find_alert(&actor(None), foreign_id).await;
    assert!(matches!(visible, Ok(found) if found.id == foreign_id));
}

#[tokio::test]
async fn anomaly_detail_and_severity_counts() {
    let fixture = fixture(&[Capability::AuditRead]);
    let tenant_id = TenantId::new();
    let critical = anomaly(tenant_id, AuditSeverity::Critical);
    let critical_id = critical.id;
    {
        let mut anomalies = fixture.repository.anomalies.lock().await;
        anomalies.push(critical);
        anomalies.push(anomaly(tenant_id, AuditSeverity::Warning));
        anomalies.push(anomaly(tenant_id, AuditSeverity::Warning));
        anomalies.push(anomaly(TenantId::new(), AuditSeverity::Emergency));
    }
    let reader = actor(Some(tenant_id));

    let found = fixture.service.find_anomaly(&reader, critical_id).await;
    assert!(matches!(found, Ok(value) if value.anomaly_type == AnomalyType::MassDataExport));

    let counts = fixture
        .service
        .anomaly_severity_counts(&reader, SecurityFindingFilter::default())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(
        counts,
        vec![
            SeverityCount {
                severity: AuditSeverity::Warning,
                count: 2
            },
            SeverityCount {
                severity: AuditSeverity::Critical,
                count: 1
            },
        ]
    );
}

#[tokio::test]
async fn alert_managers_can_read_alerts_but_not_anomalies() {
    let fixture = fixture(&[Capability::SecurityAlertsManage]);
    let reader = actor(None);

    let alerts = fixture
        .service
        .alert_severity_counts(&reader, SecurityFindingFilter::default())
        .await;
    assert!(alerts.is_ok());
    assert!(fixture.sink.records.lock().is_empty());

    let anomalies = fixture
        .service
        .list_anomalies(&reader, SecurityFindingFilter::default(), 1, 10)
        .await;
    assert!(matches!(anomalies, Err(AppError::Forbidden(_))));

    let records = fixture.sink.records.lock();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action(), AuditActionType::PermissionDenied);
    assert_eq!(records[0].subject_id(), Some("security.anomalies.list"));
}
