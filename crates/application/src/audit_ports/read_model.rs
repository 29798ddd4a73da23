use std::collections::BTreeMap;

use auditrail_core::{TenantId, UserId};
use auditrail_domain::{AuditActionType, AuditCategory, AuditRecord, AuditSeverity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter shared by audit queries, exports and counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditLogFilter {
    /// Restrict to one tenant.
    pub tenant_id: Option<TenantId>,
    /// Restrict to one actor.
    pub actor_id: Option<UserId>,
    /// Restrict to one subject entity kind.
    pub entity_type: Option<String>,
    /// Restrict to one subject entity id.
    pub entity_id: Option<String>,
    /// Inclusive lower time bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper time bound.
    pub to: Option<DateTime<Utc>>,
    /// Any of these categories; empty means all.
    pub categories: Vec<AuditCategory>,
    /// Any of these severities; empty means all.
    pub severities: Vec<AuditSeverity>,
    /// Any of these actions; empty means all.
    pub actions: Vec<AuditActionType>,
    /// Case-insensitive substring of a changed field name.
    pub changed_field: Option<String>,
}

/// Paged audit query, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogQuery {
    /// Row filter.
    pub filter: AuditLogFilter,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
}

/// One page of audit records plus the total matching count.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogPage {
    /// Records on this page.
    pub items: Vec<AuditRecord>,
    /// Total records matching the filter.
    pub total: u64,
    /// One-based page number.
    pub page: u32,
    /// Page size after clamping.
    pub page_size: u32,
}

/// Filter for aggregate statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AuditStatisticsFilter {
    /// Restrict to one tenant.
    pub tenant_id: Option<TenantId>,
    /// Inclusive lower time bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper time bound.
    pub to: Option<DateTime<Utc>>,
}

impl AuditStatisticsFilter {
    /// Returns the cache key for this filter.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "audit_stats:{}:{}:{}",
            self.tenant_id
                .map(|value| value.to_string())
                .unwrap_or_else(|| "all".to_owned()),
            self.from.map(|value| value.timestamp()).unwrap_or_default(),
            self.to.map(|value| value.timestamp()).unwrap_or_default(),
        )
    }
}

/// Activity count for one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorActivity {
    /// Actor id.
    pub actor_id: UserId,
    /// Most recent email seen for the actor.
    pub actor_email: Option<String>,
    /// Number of records.
    pub count: u64,
}

/// Occurrence count for one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCount {
    /// Action storage value.
    pub action: String,
    /// Number of records.
    pub count: u64,
}

/// Aggregate audit statistics computed at the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditStatistics {
    /// Total matching records.
    pub total_records: u64,
    /// Records flagged successful.
    pub successful_records: u64,
    /// Records flagged failed.
    pub failed_records: u64,
    /// Failed share of all records, 0.0 to 1.0.
    pub failure_rate: f64,
    /// Counts keyed by category storage value.
    pub by_category: BTreeMap<String, u64>,
    /// Counts keyed by severity storage value.
    pub by_severity: BTreeMap<String, u64>,
    /// Ten most active actors.
    pub top_actors: Vec<ActorActivity>,
    /// Ten most frequent actions.
    pub top_actions: Vec<ActionCount>,
    /// When the statistics were computed.
    pub generated_at: DateTime<Utc>,
}
