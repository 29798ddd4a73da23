use std::str::FromStr;

use auditrail_application::{
    AuditLogFilter, AuditLogPage, AuditRecordDetail, AuditStatistics, AuditStatisticsFilter,
    IntegrityReport,
};
use auditrail_core::{AppError, AppResult, TenantId, UserId};
use auditrail_domain::AuditRecord;

use super::types::{
    ActionCountResponse, ActorActivityResponse, AuditLogPageResponse, AuditLogQueryParams,
    AuditRecordDetailResponse, AuditRecordResponse, AuditStatisticsResponse,
    IntegrityReportResponse, StatisticsQueryParams,
};

const DEFAULT_PAGE_SIZE: u32 = 50;

/// Parsed audit query: filter plus 1-based page and page size.
#[derive(Debug)]
pub struct AuditLogRequest {
    pub filter: AuditLogFilter,
    pub page: u32,
    pub page_size: u32,
}

impl AuditLogQueryParams {
    pub fn into_request(self) -> AppResult<AuditLogRequest> {
        if matches!((self.from, self.to), (Some(from), Some(to)) if from > to) {
            return Err(AppError::Validation(
                "'from' must not be later than 'to'".to_owned(),
            ));
        }

        Ok(AuditLogRequest {
            filter: AuditLogFilter {
                tenant_id: self.tenant_id.map(TenantId::from_uuid),
                actor_id: self.actor_id.map(UserId::from_uuid),
                entity_type: non_empty(self.entity_type),
                entity_id: non_empty(self.entity_id),
                from: self.from,
                to: self.to,
                categories: parse_list(self.categories.as_deref())?,
                severities: parse_list(self.severities.as_deref())?,
                actions: parse_list(self.actions.as_deref())?,
                changed_field: non_empty(self.changed_field),
            },
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        })
    }
}

impl From<StatisticsQueryParams> for AuditStatisticsFilter {
    fn from(value: StatisticsQueryParams) -> Self {
        Self {
            tenant_id: value.tenant_id.map(TenantId::from_uuid),
            from: value.from,
            to: value.to,
        }
    }
}

/// Parses a comma-separated list, ignoring blank entries.
pub(in crate::dto) fn parse_list<T>(value: Option<&str>) -> AppResult<Vec<T>>
where
    T: FromStr<Err = AppError>,
{
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_ascii_lowercase().parse::<T>())
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

impl From<AuditRecord> for AuditRecordResponse {
    fn from(value: AuditRecord) -> Self {
        let request = value.request().clone();
        Self {
            id: value.id(),
            occurred_at: value.occurred_at(),
            tenant_id: value.tenant_id().map(|tenant_id| tenant_id.to_string()),
            actor_id: value.actor_id().map(|actor_id| actor_id.to_string()),
            actor_email: value.actor_email().map(ToOwned::to_owned),
            actor_role: value.actor_role().map(ToOwned::to_owned),
            action: value.action().to_string(),
            category: value.category().as_str(),
            severity: value.severity().as_str(),
            entity_type: value.subject_type().to_owned(),
            entity_id: value.subject_id().map(ToOwned::to_owned),
            success: value.success(),
            error_message: value.error_message().map(ToOwned::to_owned),
            old_values: value.old_values().cloned(),
            new_values: value.new_values().cloned(),
            changed_fields: value.changed_fields().to_vec(),
            ip_address: request.ip_address,
            user_agent: request.user_agent,
            http_method: request.http_method,
            request_path: request.request_path,
            correlation_id: request.correlation_id,
            metadata: value.metadata().cloned(),
            checksum: value.checksum().to_owned(),
        }
    }
}

impl From<AuditRecordDetail> for AuditRecordDetailResponse {
    fn from(value: AuditRecordDetail) -> Self {
        Self {
            record: AuditRecordResponse::from(value.record),
            checksum_valid: value.checksum_valid,
        }
    }
}

impl From<AuditLogPage> for AuditLogPageResponse {
    fn from(value: AuditLogPage) -> Self {
        Self {
            items: value
                .items
                .into_iter()
                .map(AuditRecordResponse::from)
                .collect(),
            total: value.total,
            page: value.page,
            page_size: value.page_size,
        }
    }
}

impl From<AuditStatistics> for AuditStatisticsResponse {
    fn from(value: AuditStatistics) -> Self {
        Self {
            total_records: value.total_records,
            successful_records: value.successful_records,
            failed_records: value.failed_records,
            failure_rate: value.failure_rate,
            by_category: value.by_category,
            by_severity: value.by_severity,
            top_actors: value
                .top_actors
                .into_iter()
                .map(|actor| ActorActivityResponse {
                    actor_id: actor.actor_id.to_string(),
                    actor_email: actor.actor_email,
                    count: actor.count,
                })
                .collect(),
            top_actions: value
                .top_actions
                .into_iter()
                .map(|action| ActionCountResponse {
                    action: action.action,
                    count: action.count,
                })
                .collect(),
            generated_at: value.generated_at,
        }
    }
}

impl From<IntegrityReport> for IntegrityReportResponse {
    fn from(value: IntegrityReport) -> Self {
        Self {
            since: value.since,
            checked: value.checked,
            intact: value.is_intact(),
            tampered_record_ids: value.tampered,
        }
    }
}
