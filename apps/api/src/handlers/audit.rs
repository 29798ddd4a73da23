use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use auditrail_application::ExportFormat;
use auditrail_core::{ActorIdentity, AppError};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::dto::{
    AuditLogPageResponse, AuditLogQueryParams, AuditLogRequest, AuditRecordDetailResponse,
    AuditStatisticsResponse, EntityHistoryParams, ExportParams, IntegrityReportResponse,
    IntegrityVerifyParams, StatisticsQueryParams,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod records;
mod reports;

pub use records::{audit_log_detail_handler, entity_history_handler, list_audit_logs_handler};
pub use reports::{audit_statistics_handler, export_audit_logs_handler, verify_integrity_handler};
