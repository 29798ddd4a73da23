use async_trait::async_trait;
use auditrail_core::AppResult;
use auditrail_domain::AuditRecord;
use uuid::Uuid;

use super::findings::{
    DetectedAnomaly, FindingPage, SecurityAlert, SecurityFindingFilter, SecurityFindingQuery,
    SeverityCount,
};
use super::read_model::{AuditLogFilter, AuditLogPage, AuditLogQuery, AuditStatistics, AuditStatisticsFilter};

/// Port for appending sealed audit records. Implementations never update or delete.
#[async_trait]
pub trait AuditRecordRepository: Send + Sync {
    /// Appends one record.
    async fn append(&self, record: &AuditRecord) -> AppResult<()>;
}

/// Read-side port for audit records.
#[async_trait]
pub trait AuditLogReadRepository: Send + Sync {
    /// Returns one page of records matching the query, newest first.
    async fn query(&self, query: &AuditLogQuery) -> AppResult<AuditLogPage>;

    /// Counts records matching the filter.
    async fn count(&self, filter: &AuditLogFilter) -> AppResult<u64>;

    /// Finds one record by id.
    async fn find_by_id(&self, record_id: Uuid) -> AppResult<Option<AuditRecord>>;

    /// Computes aggregate statistics.
    async fn statistics(&self, filter: &AuditStatisticsFilter) -> AppResult<AuditStatistics>;
}

/// Cache port for aggregate statistics.
#[async_trait]
pub trait AuditStatisticsCache: Send + Sync {
    /// Returns cached statistics when present and fresh.
    async fn get_statistics(&self, cache_key: &str) -> AppResult<Option<AuditStatistics>>;

    /// Stores statistics with a time-to-live.
    async fn set_statistics(
        &self,
        cache_key: &str,
        statistics: &AuditStatistics,
        ttl_seconds: u32,
    ) -> AppResult<()>;
}

/// Port for raised security alerts.
#[async_trait]
pub trait SecurityAlertRepository: Send + Sync {
    /// Stores one alert.
    async fn save_alert(&self, alert: &SecurityAlert) -> AppResult<()>;

    /// Returns one page of alerts, newest first.
    async fn list_alerts(&self, query: &SecurityFindingQuery)
    -> AppResult<FindingPage<SecurityAlert>>;

    /// Finds one alert by id.
    async fn find_alert(&self, alert_id: Uuid) -> AppResult<Option<SecurityAlert>>;

    /// Counts matching alerts per severity. Severities without alerts are omitted.
    async fn count_alerts_by_severity(
        &self,
        filter: &SecurityFindingFilter,
    ) -> AppResult<Vec<SeverityCount>>;
}

/// Port for detected anomalies.
#[async_trait]
pub trait AnomalyRepository: Send + Sync {
    /// Stores one anomaly.
    async fn save_anomaly(&self, anomaly: &DetectedAnomaly) -> AppResult<()>;

    /// Returns one page of anomalies, newest first.
    async fn list_anomalies(
        &self,
        query: &SecurityFindingQuery,
    ) -> AppResult<FindingPage<DetectedAnomaly>>;

    /// Finds one anomaly by id.
    async fn find_anomaly(&self, anomaly_id: Uuid) -> AppResult<Option<DetectedAnomaly>>;

    /// Counts matching anomalies per severity. Severities without anomalies are omitted.
    async fn count_anomalies_by_severity(
        &self,
        filter: &SecurityFindingFilter,
    ) -> AppResult<Vec<SeverityCount>>;
}

/// Non-blocking entry point into the audit pipeline.
pub trait AuditEventSink: Send + Sync {
    /// Submits a sealed record for delivery. Never blocks and never fails the caller.
    fn submit(&self, record: AuditRecord);
}
