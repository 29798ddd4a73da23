use std::str::FromStr;

use auditrail_application::{
    AnomalyType, DetectedAnomaly, FindingPage, SecurityAlert, SecurityAlertType,
    SecurityFindingFilter, SeverityCount,
};
use auditrail_core::{AppError, AppResult, TenantId};
use auditrail_domain::AuditSeverity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::audit::parse_list;

const DEFAULT_PAGE_SIZE: u32 = 50;

/// Filters and paging for alert and anomaly listings.
///
/// `types` is a comma-separated list of alert or anomaly type values.
#[derive(Debug, Default, Deserialize)]
pub struct FindingQueryParams {
    pub tenant_id: Option<Uuid>,
    pub types: Option<String>,
    pub min_severity: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug)]
pub struct FindingRequest {
    pub filter: SecurityFindingFilter,
    pub page: u32,
    pub page_size: u32,
}

/// Storage value of an alert or anomaly type.
trait FindingType: FromStr<Err = AppError> {
    fn value(&self) -> &'static str;
}

impl FindingType for SecurityAlertType {
    fn value(&self) -> &'static str {
        self.as_str()
    }
}

impl FindingType for AnomalyType {
    fn value(&self) -> &'static str {
        self.as_str()
    }
}

impl FindingQueryParams {
    pub fn into_alert_request(self) -> AppResult<FindingRequest> {
        self.into_request::<SecurityAlertType>()
    }

    pub fn into_anomaly_request(self) -> AppResult<FindingRequest> {
        self.into_request::<AnomalyType>()
    }

    fn into_request<T: FindingType>(self) -> AppResult<FindingRequest> {
        if matches!((self.from, self.to), (Some(from), Some(to)) if from > to) {
            return Err(AppError::Validation(
                "'from' must not be later than 'to'".to_owned(),
            ));
        }

        let finding_types = parse_list::<T>(self.types.as_deref())?
            .iter()
            .map(|finding_type| finding_type.value().to_owned())
            .collect();
        let min_severity = self
            .min_severity
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_ascii_lowercase().parse::<AuditSeverity>())
            .transpose()?;

        Ok(FindingRequest {
            filter: SecurityFindingFilter {
                tenant_id: self.tenant_id.map(TenantId::from_uuid),
                finding_types,
                min_severity,
                from: self.from,
                to: self.to,
            },
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SecurityAlertResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub tenant_id: Option<String>,
    pub actor_id: Option<String>,
    pub actor_email: Option<String>,
    pub alert_type: &'static str,
    pub severity: &'static str,
    pub risk_score: u8,
    pub title: String,
    pub description: String,
    pub audit_record_id: Uuid,
    pub ip_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnomalyResponse {
    pub id: Uuid,
    pub detected_at: DateTime<Utc>,
    pub tenant_id: Option<String>,
    pub actor_id: Option<String>,
    pub actor_email: Option<String>,
    pub anomaly_type: &'static str,
    pub severity: &'static str,
    pub risk_score: u8,
    pub description: String,
    pub evidence: Value,
    pub audit_record_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct FindingPageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct SeverityCountResponse {
    pub severity: &'static str,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct SeverityCountsResponse {
    pub total: u64,
    pub by_severity: Vec<SeverityCountResponse>,
}

impl From<SecurityAlert> for SecurityAlertResponse {
    fn from(value: SecurityAlert) -> Self {
        Self {
            id: value.id,
            created_at: value.created_at,
            tenant_id: value.tenant_id.map(|tenant_id| tenant_id.to_string()),
            actor_id: value.actor_id.map(|actor_id| actor_id.to_string()),
            actor_email: value.actor_email,
            alert_type: value.alert_type.as_str(),
            severity: value.severity.as_str(),
            risk_score: value.risk_score,
            title: value.title,
            description: value.description,
            audit_record_id: value.audit_record_id,
            ip_address: value.ip_address,
        }
    }
}

impl From<DetectedAnomaly> for AnomalyResponse {
    fn from(value: DetectedAnomaly) -> Self {
        Self {
            id: value.id,
            detected_at: value.detected_at,
            tenant_id: value.tenant_id.map(|tenant_id| tenant_id.to_string()),
            actor_id: value.actor_id.map(|actor_id| actor_id.to_string()),
            actor_email: value.actor_email,
            anomaly_type: value.anomaly_type.as_str(),
            severity: value.severity.as_str(),
            risk_score: value.risk_score,
            description: value.description,
            evidence: value.evidence,
            audit_record_id: value.audit_record_id,
        }
    }
}

impl<T, R: From<T>> From<FindingPage<T>> for FindingPageResponse<R> {
    fn from(value: FindingPage<T>) -> Self {
        Self {
            items: value.items.into_iter().map(R::from).collect(),
            total: value.total,
            page: value.page,
            page_size: value.page_size,
        }
    }
}

impl From<Vec<SeverityCount>> for SeverityCountsResponse {
    fn from(value: Vec<SeverityCount>) -> Self {
        Self {
            total: value.iter().map(|entry| entry.count).sum(),
            by_severity: value
                .into_iter()
                .map(|entry| SeverityCountResponse {
                    severity: entry.severity.as_str(),
                    count: entry.count,
                })
                .collect(),
        }
    }
}
