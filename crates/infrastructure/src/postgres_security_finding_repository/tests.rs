use auditrail_application::{
    AnomalyRepository, AnomalyType, DetectedAnomaly, SecurityAlert, SecurityAlertRepository,
    SecurityAlertType, SecurityFindingFilter, SecurityFindingQuery, SeverityCount,
};
use auditrail_core::{TenantId, UserId};
use auditrail_domain::AuditSeverity;
use chrono::{Duration, SubsecRound, Utc};
use serde_json::json;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresSecurityFindingRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for security finding tests: {error}");
    }

    Some(pool)
}

fn alert(tenant_id: TenantId, severity: AuditSeverity, minutes_ago: i64) -> SecurityAlert {
    SecurityAlert {
        id: Uuid::new_v4(),
        created_at: (Utc::now() - Duration::minutes(minutes_ago)).trunc_subsecs(6),
        tenant_id: Some(tenant_id),
        actor_id: Some(UserId::new()),
        actor_email: Some("clerk@acme.test".to_owned()),
        alert_type: SecurityAlertType::MassDataExport,
        severity,
        risk_score: 80,
        title: "Mass data export".to_owned(),
        description: "1200 records exported".to_owned(),
        audit_record_id: Uuid::new_v4(),
        ip_address: Some("10.0.0.8".to_owned()),
    }
}

fn tenant_filter(tenant_id: TenantId) -> SecurityFindingFilter {
    SecurityFindingFilter {
        tenant_id: Some(tenant_id),
        ..SecurityFindingFilter::default()
    }
}

#[tokio::test]
async fn saved_alerts_list_newest_first_and_find_by_id() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresSecurityFindingRepository::new(pool);
    let tenant_id = TenantId::new();
    let older = alert(tenant_id, AuditSeverity::Warning, 20);
    let newer = alert(tenant_id, AuditSeverity::Critical, 1);

    for value in [&older, &newer] {
        let saved = repository.save_alert(value).await;
        assert!(saved.is_ok());
    }

    let page = repository
        .list_alerts(&SecurityFindingQuery {
            filter: tenant_filter(tenant_id),
            limit: 10,
            offset: 0,
        })
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].id, newer.id);

    let found = repository
        .find_alert(older.id)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(found, Some(older));
}

#[tokio::test]
async fn alert_filters_apply_minimum_severity_and_counts_group_by_severity() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresSecurityFindingRepository::new(pool);
    let tenant_id = TenantId::new();
    for severity in [
        AuditSeverity::Info,
        AuditSeverity::Critical,
        AuditSeverity::Critical,
        AuditSeverity::Emergency,
    ] {
        let saved = repository.save_alert(&alert(tenant_id, severity, 0)).await;
        assert!(saved.is_ok());
    }

    let severe = repository
        .list_alerts(&SecurityFindingQuery {
            filter: SecurityFindingFilter {
                min_severity: Some(AuditSeverity::Critical),
                ..tenant_filter(tenant_id)
            },
            limit: 10,
            offset: 0,
        })
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(severe.total, 3);

    let counts = repository
        .count_alerts_by_severity(&tenant_filter(tenant_id))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(
        counts,
        vec![
            SeverityCount {
                severity: AuditSeverity::Info,
                count: 1
            },
            SeverityCount {
                severity: AuditSeverity::Critical,
                count: 2
            },
            SeverityCount {
                severity: AuditSeverity::Emergency,
                count: 1
            },
        ]
    );
}

#[tokio::test]
async fn saved_anomalies_read_back_by_type() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresSecurityFindingRepository::new(pool);
    let tenant_id = TenantId::new();
    let anomaly = DetectedAnomaly {
        id: Uuid::new_v4(),
        detected_at: Utc::now().trunc_subsecs(6),
        tenant_id: Some(tenant_id),
        actor_id: None,
        actor_email: Some("target@acme.test".to_owned()),
        anomaly_type: AnomalyType::FailedLoginBurst,
        severity: AuditSeverity::Critical,
        risk_score: 90,
        description: "10 failed sign-ins in 15 minutes".to_owned(),
        evidence: json!({ "attempts": 10 }),
        audit_record_id: Uuid::new_v4(),
    };
    let saved = repository.save_anomaly(&anomaly).await;
    assert!(saved.is_ok());

    let page = repository
        .list_anomalies(&SecurityFindingQuery {
            filter: SecurityFindingFilter {
                finding_types: vec!["failed_login_burst".to_owned()],
                ..tenant_filter(tenant_id)
            },
            limit: 5,
            offset: 0,
        })
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(page.items, vec![anomaly.clone()]);

    let found = repository
        .find_anomaly(anomaly.id)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(found, Some(anomaly));
}
