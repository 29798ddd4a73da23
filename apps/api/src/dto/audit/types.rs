use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Filters and paging accepted by the audit log query and export endpoints.
///
/// `categories`, `severities` and `actions` are comma-separated lists.
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQueryParams {
    pub tenant_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub categories: Option<String>,
    pub severities: Option<String>,
    pub actions: Option<String>,
    pub changed_field: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EntityHistoryParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQueryParams {
    pub tenant_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IntegrityVerifyParams {
    pub since_days: Option<u32>,
}

/// API representation of one audit record.
#[derive(Debug, Serialize)]
pub struct AuditRecordResponse {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub tenant_id: Option<String>,
    pub actor_id: Option<String>,
    pub actor_email: Option<String>,
    pub actor_role: Option<String>,
    pub action: String,
    pub category: &'static str,
    pub severity: &'static str,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub changed_fields: Vec<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub http_method: Option<String>,
    pub request_path: Option<String>,
    pub correlation_id: Option<String>,
    pub metadata: Option<Value>,
    pub checksum: String,
}

#[derive(Debug, Serialize)]
pub struct AuditRecordDetailResponse {
    #[serde(flatten)]
    pub record: AuditRecordResponse,
    pub checksum_valid: bool,
}

#[derive(Debug, Serialize)]
pub struct AuditLogPageResponse {
    pub items: Vec<AuditRecordResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct ActorActivityResponse {
    pub actor_id: String,
    pub actor_email: Option<String>,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct ActionCountResponse {
    pub action: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct AuditStatisticsResponse {
    pub total_records: u64,
    pub successful_records: u64,
    pub failed_records: u64,
    pub failure_rate: f64,
    pub by_category: BTreeMap<String, u64>,
    pub by_severity: BTreeMap<String, u64>,
    pub top_actors: Vec<ActorActivityResponse>,
    pub top_actions: Vec<ActionCountResponse>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct IntegrityReportResponse {
    pub since: DateTime<Utc>,
    pub checked: u64,
    pub intact: bool,
    pub tampered_record_ids: Vec<Uuid>,
}
