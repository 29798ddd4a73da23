use std::sync::Arc;

use auditrail_core::{ActorIdentity, AppError, AppResult};
use auditrail_domain::Capability;
use uuid::Uuid;

use crate::audit_log_service::{MAX_PAGE_SIZE, is_visible_to, scope_tenant};
use crate::audit_ports::{
    AnomalyRepository, DetectedAnomaly, FindingPage, SecurityAlert, SecurityAlertRepository,
    SecurityFindingFilter, SecurityFindingQuery, SeverityCount,
};
use crate::authorization_gate::{AuthorizationGate, ProtectedOperation};

#[cfg(test)]
mod tests;

/// Read access to raised security alerts and detected anomalies.
///
/// Tenant-bound actors only ever see findings of their own tenant.
#[derive(Clone)]
pub struct SecurityFindingsService {
    alerts: Arc<dyn SecurityAlertRepository>,
    anomalies: Arc<dyn AnomalyRepository>,
    gate: AuthorizationGate,
}

impl SecurityFindingsService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        alerts: Arc<dyn SecurityAlertRepository>,
        anomalies: Arc<dyn AnomalyRepository>,
        gate: AuthorizationGate,
    ) -> Self {
        Self {
            alerts,
            anomalies,
            gate,
        }
    }

    /// Returns one page of alerts, newest first.
    pub async fn list_alerts(
        &self,
        actor: &ActorIdentity,
        filter: SecurityFindingFilter,
        page: u32,
        page_size: u32,
    ) -> AppResult<FindingPage<SecurityAlert>> {
        self.authorize_alerts(actor, "security.alerts.list").await?;
        let (query, page, page_size) = page_query(actor, filter, page, page_size)?;

        let mut result = self.alerts.list_alerts(&query).await?;
        result.page = page;
        result.page_size = page_size;
        Ok(result)
    }

    /// Returns one alert.
    pub async fn find_alert(&self, actor: &ActorIdentity, alert_id: Uuid) -> AppResult<SecurityAlert> {
        self.authorize_alerts(actor, "security.alerts.detail").await?;

        self.alerts
            .find_alert(alert_id)
            .await?
            .filter(|alert| is_visible_to(actor, alert.tenant_id))
            .ok_or_else(|| AppError::NotFound(format!("security alert '{alert_id}' not found")))
    }

    /// Counts alerts per severity.
    pub async fn alert_severity_counts(
        &self,
        actor: &ActorIdentity,
        mut filter: SecurityFindingFilter,
    ) -> AppResult<Vec<SeverityCount>> {
        self.authorize_alerts(actor, "security.alerts.counts").await?;
        filter.tenant_id = scope_tenant(actor, filter.tenant_id)?;
        self.alerts.count_alerts_by_severity(&filter).await
    }

    /// Returns one page of anomalies, newest first.
    pub async fn list_anomalies(
        &self,
        actor: &ActorIdentity,
        filter: SecurityFindingFilter,
        page: u32,
        page_size: u32,
    ) -> AppResult<FindingPage<DetectedAnomaly>> {
        self.authorize_anomalies(actor, "security.anomalies.list").await?;
        let (query, page, page_size) = page_query(actor, filter, page, page_size)?;

        let mut result = self.anomalies.list_anomalies(&query).await?;
        result.page = page;
        result.page_size = page_size;
        Ok(result)
    }

    /// Returns one anomaly.
    pub async fn find_anomaly(
        &self,
        actor: &ActorIdentity,
        anomaly_id: Uuid,
    ) -> AppResult<DetectedAnomaly> {
        self.authorize_anomalies(actor, "security.anomalies.detail").await?;

        self.anomalies
            .find_anomaly(anomaly_id)
            .await?
            .filter(|anomaly| is_visible_to(actor, anomaly.tenant_id))
            .ok_or_else(|| AppError::NotFound(format!("anomaly '{anomaly_id}' not found")))
    }

    /// Counts anomalies per severity.
    pub async fn anomaly_severity_counts(
        &self,
        actor: &ActorIdentity,
        mut filter: SecurityFindingFilter,
    ) -> AppResult<Vec<SeverityCount>> {
        self.authorize_anomalies(actor, "security.anomalies.counts").await?;
        filter.tenant_id = scope_tenant(actor, filter.tenant_id)?;
        self.anomalies.count_anomalies_by_severity(&filter).await
    }

    async fn authorize_alerts(&self, actor: &ActorIdentity, endpoint: &str) -> AppResult<()> {
        self.gate
            .authorize(
                actor,
                &ProtectedOperation::new(
                    endpoint,
                    [
                        Capability::AuditRead,
                        Capability::SecurityAlertsManage,
                        Capability::AuditAdmin,
                    ],
                ),
            )
            .await
    }

    async fn authorize_anomalies(&self, actor: &ActorIdentity, endpoint: &str) -> AppResult<()> {
        self.gate
            .authorize(
                actor,
                &ProtectedOperation::new(endpoint, [Capability::AuditRead, Capability::AuditAdmin]),
            )
            .await
    }
}

fn page_query(
    actor: &ActorIdentity,
    mut filter: SecurityFindingFilter,
    page: u32,
    page_size: u32,
) -> AppResult<(SecurityFindingQuery, u32, u32)> {
    filter.tenant_id = scope_tenant(actor, filter.tenant_id)?;

    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let query = SecurityFindingQuery {
        filter,
        limit: page_size as usize,
        offset: (page as usize - 1) * page_size as usize,
    };
    Ok((query, page, page_size))
}
