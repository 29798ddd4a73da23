use auditrail_core::{ActorIdentity, AppResult, TenantId};
use auditrail_domain::{
    AuditActionType, AuditCategory, AuditRecordDraft, AuditSeverity, Capability,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::audit_ports::{AuditLogFilter, AuditLogQuery};
use crate::authorization_gate::ProtectedOperation;

use super::{AuditLogService, scope_tenant};

/// Records read per page while verifying checksums.
pub const INTEGRITY_PAGE_SIZE: usize = 1_000;

/// Outcome of a checksum verification sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Lower bound of the sweep.
    pub since: DateTime<Utc>,
    /// Records whose checksum was recomputed.
    pub checked: u64,
    /// Records whose stored checksum no longer matches.
    pub tampered: Vec<Uuid>,
}

impl IntegrityReport {
    /// Returns whether every checked record verified.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        self.tampered.is_empty()
    }
}

impl AuditLogService {
    /// Verifies checksums of records since `since`, on behalf of an administrator.
    pub async fn verify_integrity(
        &self,
        actor: &ActorIdentity,
        since: DateTime<Utc>,
    ) -> AppResult<IntegrityReport> {
        self.gate
            .authorize(
                actor,
                &ProtectedOperation::new("audit.integrity.verify", [Capability::AuditAdmin]),
            )
            .await?;
        let tenant_id = scope_tenant(actor, None)?;

        self.run_integrity_check(tenant_id, since).await
    }

    /// Verifies checksums of records since `since` without an acting identity.
    ///
    /// Used by the periodic background check. Any mismatch is reported through
    /// one emergency security record listing the tampered ids.
    pub async fn run_integrity_check(
        &self,
        tenant_id: Option<TenantId>,
        since: DateTime<Utc>,
    ) -> AppResult<IntegrityReport> {
        let filter = AuditLogFilter {
            tenant_id,
            from: Some(since),
            ..AuditLogFilter::default()
        };

        let mut report = IntegrityReport {
            since,
            checked: 0,
            tampered: Vec::new(),
        };
        let mut offset = 0;
        loop {
            let page = self
                .repository
                .query(&AuditLogQuery {
                    filter: filter.clone(),
                    limit: INTEGRITY_PAGE_SIZE,
                    offset,
                })
                .await?;
            let fetched = page.items.len();

            for record in &page.items {
                report.checked += 1;
                if !record.verify_checksum() {
                    report.tampered.push(record.id());
                }
            }

            offset += fetched;
            if fetched < INTEGRITY_PAGE_SIZE {
                break;
            }
        }

        if report.is_intact() {
            info!(checked = report.checked, since = %since, "audit integrity verified");
        } else {
            error!(
                checked = report.checked,
                tampered = report.tampered.len(),
                since = %since,
                "audit integrity violation detected"
            );
            self.record_violation(tenant_id, &report);
        }

        Ok(report)
    }

    fn record_violation(&self, tenant_id: Option<TenantId>, report: &IntegrityReport) {
        let mut draft = AuditRecordDraft::new(
            AuditActionType::IntegrityViolationDetected,
            AuditCategory::Security,
            AuditSeverity::Emergency,
            "AuditLog",
        );
        draft.tenant_id = tenant_id;
        draft.success = false;
        draft.error_message = Some(format!(
            "{} audit records failed checksum verification",
            report.tampered.len()
        ));
        draft.metadata = Some(json!({
            "tampered_record_ids": report.tampered,
            "checked": report.checked,
            "since": report.since.to_rfc3339(),
        }));

        self.sink.submit(draft.seal());
    }
}
