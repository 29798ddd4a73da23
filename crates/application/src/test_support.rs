use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use auditrail_core::{ActorIdentity, AppResult, TenantId, UserId};
use auditrail_domain::{
    AuditActionType, AuditCategory, AuditRecord, AuditRecordDraft, AuditSeverity, Capability,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::audit_ports::{
    AnomalyRepository, AuditEventSink, AuditRecordRepository, DetectedAnomaly, FindingPage,
    SecurityAlert, SecurityAlertRepository, SecurityFindingFilter, SecurityFindingQuery,
    SeverityCount,
};
use crate::authorization_gate::PermissionLookup;

pub(crate) fn record(
    action: AuditActionType,
    category: AuditCategory,
    severity: AuditSeverity,
) -> AuditRecord {
    let mut draft = AuditRecordDraft::new(action, category, severity, "Employee");
    draft.actor_id = Some(UserId::new());
    draft.subject_id = Some("employee-1".to_owned());
    draft.seal()
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) records: Mutex<Vec<AuditRecord>>,
}

impl AuditEventSink for RecordingSink {
    fn submit(&self, record: AuditRecord) {
        self.records.lock().push(record);
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditRecordRepository {
    pub(crate) records: tokio::sync::Mutex<Vec<AuditRecord>>,
}

#[async_trait]
impl AuditRecordRepository for FakeAuditRecordRepository {
    async fn append(&self, record: &AuditRecord) -> AppResult<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[derive(Default)]
pub(crate) struct FakeSecurityFindingRepository {
    pub(crate) alerts: tokio::sync::Mutex<Vec<SecurityAlert>>,
    pub(crate) anomalies: tokio::sync::Mutex<Vec<DetectedAnomaly>>,
}

fn matches_filter(
    filter: &SecurityFindingFilter,
    tenant_id: Option<TenantId>,
    finding_type: &str,
    severity: AuditSeverity,
    at: DateTime<Utc>,
) -> bool {
    filter
        .tenant_id
        .is_none_or(|wanted| tenant_id == Some(wanted))
        && (filter.finding_types.is_empty()
            || filter.finding_types.iter().any(|wanted| wanted == finding_type))
        && filter
            .min_severity
            .is_none_or(|threshold| severity.at_least(threshold))
        && filter.from.is_none_or(|from| at >= from)
        && filter.to.is_none_or(|to| at <= to)
}

fn page_of<T>(matching: Vec<T>, query: &SecurityFindingQuery) -> FindingPage<T> {
    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();
    FindingPage {
        items,
        total,
        page: 0,
        page_size: 0,
    }
}

fn severity_counts(severities: impl Iterator<Item = AuditSeverity>) -> Vec<SeverityCount> {
    let mut counts: BTreeMap<AuditSeverity, u64> = BTreeMap::new();
    for severity in severities {
        *counts.entry(severity).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(severity, count)| SeverityCount { severity, count })
        .collect()
}

#[async_trait]
impl SecurityAlertRepository for FakeSecurityFindingRepository {
    async fn save_alert(&self, alert: &SecurityAlert) -> AppResult<()> {
        self.alerts.lock().await.push(alert.clone());
        Ok(())
    }

    async fn list_alerts(
        &self,
        query: &SecurityFindingQuery,
    ) -> AppResult<FindingPage<SecurityAlert>> {
        let mut matching: Vec<SecurityAlert> = self
            .alerts
            .lock()
            .await
            .iter()
            .filter(|alert| {
                matches_filter(
                    &query.filter,
                    alert.tenant_id,
                    alert.alert_type.as_str(),
                    alert.severity,
                    alert.created_at,
                )
            })
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(page_of(matching, query))
    }

    async fn find_alert(&self, alert_id: Uuid) -> AppResult<Option<SecurityAlert>> {
        Ok(self
            .alerts
            .lock()
            .await
            .iter()
            .find(|alert| alert.id == alert_id)
            .cloned())
    }

    async fn count_alerts_by_severity(
        &self,
        filter: &SecurityFindingFilter,
    ) -> AppResult<Vec<SeverityCount>> {
        let alerts = self.alerts.lock().await;
        Ok(severity_counts(
            alerts
                .iter()
                .filter(|alert| {
                    matches_filter(
                        filter,
                        alert.tenant_id,
                        alert.alert_type.as_str(),
                        alert.severity,
                        alert.created_at,
                    )
                })
                .map(|alert| alert.severity),
        ))
    }
}

#[async_trait]
impl AnomalyRepository for FakeSecurityFindingRepository {
    async fn save_anomaly(&self, anomaly: &DetectedAnomaly) -> AppResult<()> {
        self.anomalies.lock().await.push(anomaly.clone());
        Ok(())
    }

    async fn list_anomalies(
        &self,
        query: &SecurityFindingQuery,
    ) -> AppResult<FindingPage<DetectedAnomaly>> {
        let mut matching: Vec<DetectedAnomaly> = self
            .anomalies
            .lock()
            .await
            .iter()
            .filter(|anomaly| {
                matches_filter(
                    &query.filter,
                    anomaly.tenant_id,
                    anomaly.anomaly_type.as_str(),
                    anomaly.severity,
                    anomaly.detected_at,
                )
            })
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.detected_at.cmp(&left.detected_at));
        Ok(page_of(matching, query))
    }

    async fn find_anomaly(&self, anomaly_id: Uuid) -> AppResult<Option<DetectedAnomaly>> {
        Ok(self
            .anomalies
            .lock()
            .await
            .iter()
            .find(|anomaly| anomaly.id == anomaly_id)
            .cloned())
    }

    async fn count_anomalies_by_severity(
        &self,
        filter: &SecurityFindingFilter,
    ) -> AppResult<Vec<SeverityCount>> {
        let anomalies = self.anomalies.lock().await;
        Ok(severity_counts(
            anomalies
                .iter()
                .filter(|anomaly| {
                    matches_filter(
                        filter,
                        anomaly.tenant_id,
                        anomaly.anomaly_type.as_str(),
                        anomaly.severity,
                        anomaly.detected_at,
                    )
                })
                .map(|anomaly| anomaly.severity),
        ))
    }
}

/// Grants the same capabilities to every actor.
pub(crate) struct GrantedCapabilities(pub(crate) HashSet<Capability>);

impl GrantedCapabilities {
    pub(crate) fn of(capabilities: &[Capability]) -> Self {
        Self(capabilities.iter().copied().collect())
    }
}

#[async_trait]
impl PermissionLookup for GrantedCapabilities {
    async fn has_permission(
        &self,
        _actor: &ActorIdentity,
        capability: Capability,
    ) -> AppResult<bool> {
        Ok(self.0.contains(&capability))
    }
}
