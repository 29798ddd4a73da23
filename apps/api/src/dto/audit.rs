mod conversions;
mod types;

#[cfg(test)]
mod tests;

pub use conversions::AuditLogRequest;
pub(super) use conversions::parse_list;
pub use types::{
    AuditLogPageResponse, AuditLogQueryParams, AuditRecordDetailResponse, AuditStatisticsResponse,
    EntityHistoryParams, ExportParams, IntegrityReportResponse, IntegrityVerifyParams,
    StatisticsQueryParams,
};
