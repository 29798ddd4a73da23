use std::sync::Arc;

use auditrail_core::{ActorIdentity, AppError, AppResult, TenantId};
use auditrail_domain::{AuditRecord, Capability};
use tracing::debug;
use uuid::Uuid;

use crate::audit_ports::{
    AuditEventSink, AuditLogFilter, AuditLogPage, AuditLogQuery, AuditLogReadRepository,
    AuditStatistics, AuditStatisticsCache, AuditStatisticsFilter,
};
use crate::authorization_gate::{AuthorizationGate, ProtectedOperation};

mod export;
mod integrity;


pub use export::{AuditExport, ExportFormat, MAX_EXPORT_RECORDS};
pub use integrity::{INTEGRITY_PAGE_SIZE, IntegrityReport};

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 1_000;

/// Audit record with its recomputed integrity status.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecordDetail {
    /// Stored record.
    pub record: AuditRecord,
    /// Whether the stored checksum matches the recomputed one.
    pub checksum_valid: bool,
}

/// Read-back, export and integrity verification over the audit trail.
#[derive(Clone)]
pub struct AuditLogService {
    repository: Arc<dyn AuditLogReadRepository>,
    statistics_cache: Arc<dyn AuditStatisticsCache>,
    statistics_ttl_seconds: u32,
    gate: AuthorizationGate,
    sink: Arc<dyn AuditEventSink>,
}

impl AuditLogService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AuditLogReadRepository>,
        statistics_cache: Arc<dyn AuditStatisticsCache>,
        statistics_ttl_seconds: u32,
        gate: AuthorizationGate,
        sink: Arc<dyn AuditEventSink>,
    ) -> Self {
        Self {
            repository,
            statistics_cache,
            statistics_ttl_seconds,
            gate,
            sink,
        }
    }

    /// Returns one page of matching records, newest first.
    pub async fn query(
        &self,
        actor: &ActorIdentity,
        mut filter: AuditLogFilter,
        page: u32,
        page_size: u32,
    ) -> AppResult<AuditLogPage> {
        self.authorize_read(actor, "audit.logs.query").await?;
        filter.tenant_id = scope_tenant(actor, filter.tenant_id)?;

        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let query = AuditLogQuery {
            filter,
            limit: page_size as usize,
            offset: (page as usize - 1) * page_size as usize,
        };

        let mut result = self.repository.query(&query).await?;
        result.page = page;
        result.page_size = page_size;
        Ok(result)
    }

    /// Returns one record with its integrity status.
    pub async fn find_record(
        &self,
        actor: &ActorIdentity,
        record_id: Uuid,
    ) -> AppResult<AuditRecordDetail> {
        self.authorize_read(actor, "audit.logs.detail").await?;

        let record = self
            .repository
            .find_by_id(record_id)
            .await?
            .filter(|record| is_visible_to(actor, record.tenant_id()))
            .ok_or_else(|| AppError::NotFound(format!("audit record '{record_id}' not found")))?;

        Ok(AuditRecordDetail {
            checksum_valid: record.verify_checksum(),
            record,
        })
    }

    /// Returns the change history of one entity, newest first.
    pub async fn entity_history(
        &self,
        actor: &ActorIdentity,
        entity_type: &str,
        entity_id: &str,
        page: u32,
        page_size: u32,
    ) -> AppResult<AuditLogPage> {
        let entity_type = entity_type.trim();
        let entity_id = entity_id.trim();
        if entity_type.is_empty() || entity_id.is_empty() {
            return Err(AppError::Validation(
                "entity type and entity id are required".to_owned(),
            ));
        }

        let filter = AuditLogFilter {
            entity_type: Some(entity_type.to_owned()),
            entity_id: Some(entity_id.to_owned()),
            ..AuditLogFilter::default()
        };
        self.query(actor, filter, page, page_size).await
    }

    /// Returns aggregate statistics, served from cache while fresh.
    pub async fn statistics(
        &self,
        actor: &ActorIdentity,
        mut filter: AuditStatisticsFilter,
    ) -> AppResult<AuditStatistics> {
        self.authorize_read(actor, "audit.statistics").await?;
        filter.tenant_id = scope_tenant(actor, filter.tenant_id)?;

        let cache_key = filter.cache_key();
        if let Some(statistics) = self.statistics_cache.get_statistics(&cache_key).await? {
            debug!(cache_key = %cache_key, "audit statistics cache hit");
            return Ok(statistics);
        }

        let mut statistics = self.repository.statistics(&filter).await?;
        statistics.failure_rate = failure_rate(statistics.failed_records, statistics.total_records);
        self.statistics_cache
            .set_statistics(&cache_key, &statistics, self.statistics_ttl_seconds)
            .await?;
        Ok(statistics)
    }

    async fn authorize_read(&self, actor: &ActorIdentity, endpoint: &str) -> AppResult<()> {
        self.gate
            .authorize(
                actor,
                &ProtectedOperation::new(endpoint, [Capability::AuditRead, Capability::AuditAdmin]),
            )
            .await
    }
}

/// Forces tenant-bound actors onto their own tenant.
pub(crate) fn scope_tenant(actor: &ActorIdentity, requested: Option<TenantId>) -> AppResult<Option<TenantId>> {
    match (actor.tenant_id(), requested) {
        (Some(own), Some(requested)) if own != requested => Err(AppError::Forbidden(format!(
            "actor may not read audit data of tenant '{requested}'"
        ))),
        (Some(own), _) => Ok(Some(own)),
        (None, requested) => Ok(requested),
    }
}

pub(crate) fn is_visible_to(actor: &ActorIdentity, record_tenant: Option<TenantId>) -> bool {
    actor
        .tenant_id()
        .is_none_or(|own| record_tenant == Some(own))
}

fn failure_rate(failed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        failed as f64 / total as f64
    }
}
