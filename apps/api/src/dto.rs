mod audit;
mod capture;
mod common;
mod dispatch;
mod findings;

pub use audit::{
    AuditLogPageResponse, AuditLogQueryParams, AuditLogRequest, AuditRecordDetailResponse,
    AuditStatisticsResponse, EntityHistoryParams, ExportParams, IntegrityReportResponse,
    IntegrityVerifyParams, StatisticsQueryParams,
};
pub use capture::{CaptureChangesRequest, CaptureChangesResponse};
pub use common::{HealthDependencyStatus, HealthResponse, TenantCacheResponse};
pub use dispatch::DispatchStatsResponse;
pub use findings::{
    AnomalyResponse, FindingPageResponse, FindingQueryParams, FindingRequest,
    SecurityAlertResponse, SeverityCountsResponse,
};
