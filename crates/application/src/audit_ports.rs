mod findings;
mod read_model;
mod repositories;

pub use findings::{
    AnomalyType, DetectedAnomaly, FindingPage, SecurityAlert, SecurityAlertType,
    SecurityFindingFilter, SecurityFindingQuery, SeverityCount,
};
pub use read_model::{
    ActionCount, ActorActivity, AuditLogFilter, AuditLogPage, AuditLogQuery, AuditStatistics,
    AuditStatisticsFilter,
};
pub use repositories::{
    AnomalyRepository, AuditEventSink, AuditLogReadRepository, AuditRecordRepository,
    AuditStatisticsCache, SecurityAlertRepository,
};
