use std::str::FromStr;

use auditrail_core::{AppError, TenantId, UserId};
use auditrail_domain::AuditSeverity;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Behavioural pattern flagged by anomaly evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyType {
    /// Repeated failed sign-ins for one account.
    FailedLoginBurst,
    /// Burst of high-risk actions by one actor.
    RapidHighRiskActions,
    /// Export of a large number of records.
    MassDataExport,
    /// Sensitive activity outside business hours.
    AfterHoursActivity,
    /// Large relative change to compensation.
    LargeCompensationChange,
    /// Actor changed their own privileges.
    PrivilegeSelfModification,
}

impl AnomalyType {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailedLoginBurst => "failed_login_burst",
            Self::RapidHighRiskActions => "rapid_high_risk_actions",
            Self::MassDataExport => "mass_data_export",
            Self::AfterHoursActivity => "after_hours_activity",
            Self::LargeCompensationChange => "large_compensation_change",
            Self::PrivilegeSelfModification => "privilege_self_modification",
        }
    }

    /// Returns all anomaly types.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::FailedLoginBurst,
            Self::RapidHighRiskActions,
            Self::MassDataExport,
            Self::AfterHoursActivity,
            Self::LargeCompensationChange,
            Self::PrivilegeSelfModification,
        ]
    }
}

impl FromStr for AnomalyType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|anomaly_type| anomaly_type.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown anomaly type '{value}'")))
    }
}

/// Anomaly detected over the audit stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedAnomaly {
    /// Anomaly id.
    pub id: Uuid,
    /// Detection time.
    pub detected_at: DateTime<Utc>,
    /// Tenant scope.
    pub tenant_id: Option<TenantId>,
    /// Actor the anomaly is attributed to.
    pub actor_id: Option<UserId>,
    /// Actor email, when known.
    pub actor_email: Option<String>,
    /// Detected pattern.
    pub anomaly_type: AnomalyType,
    /// Assessed severity.
    pub severity: AuditSeverity,
    /// Risk score, 0 to 100.
    pub risk_score: u8,
    /// Human-readable summary.
    pub description: String,
    /// Structured evidence.
    pub evidence: Value,
    /// Audit record that completed the pattern.
    pub audit_record_id: Uuid,
}

/// Category of a raised security alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityAlertType {
    /// Access attempt rejected by authorization.
    UnauthorizedAccess,
    /// Failed sign-ins crossed the threshold.
    FailedLoginThreshold,
    /// Critical bulk export.
    MassDataExport,
    /// Sensitive activity outside business hours.
    AfterHoursAccess,
    /// Compensation data changed.
    CompensationChange,
    /// Critical security event.
    CriticalSecurityEvent,
}

impl SecurityAlertType {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnauthorizedAccess => "unauthorized_access",
            Self::FailedLoginThreshold => "failed_login_threshold",
            Self::MassDataExport => "mass_data_export",
            Self::AfterHoursAccess => "after_hours_access",
            Self::CompensationChange => "compensation_change",
            Self::CriticalSecurityEvent => "critical_security_event",
        }
    }

    /// Returns all alert types.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::UnauthorizedAccess,
            Self::FailedLoginThreshold,
            Self::MassDataExport,
            Self::AfterHoursAccess,
            Self::CompensationChange,
            Self::CriticalSecurityEvent,
        ]
    }
}

impl FromStr for SecurityAlertType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|alert_type| alert_type.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown security alert type '{value}'")))
    }
}

/// Security alert awaiting review.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityAlert {
    /// Alert id.
    pub id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Tenant scope.
    pub tenant_id: Option<TenantId>,
    /// Actor involved.
    pub actor_id: Option<UserId>,
    /// Actor email, when known.
    pub actor_email: Option<String>,
    /// Alert category.
    pub alert_type: SecurityAlertType,
    /// Alert severity.
    pub severity: AuditSeverity,
    /// Risk score, 0 to 100.
    pub risk_score: u8,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Audit record that raised the alert.
    pub audit_record_id: Uuid,
    /// Client IP address, when known.
    pub ip_address: Option<String>,
}

/// Filter over stored alerts or anomalies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityFindingFilter {
    /// Tenant scope.
    pub tenant_id: Option<TenantId>,
    /// Alert or anomaly type storage values; empty matches all.
    pub finding_types: Vec<String>,
    /// Minimum severity, inclusive.
    pub min_severity: Option<AuditSeverity>,
    /// Inclusive lower bound on creation time.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time.
    pub to: Option<DateTime<Utc>>,
}

/// One page request over stored findings, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityFindingQuery {
    /// Filter.
    pub filter: SecurityFindingFilter,
    /// Rows to return.
    pub limit: usize,
    /// Rows to skip.
    pub offset: usize,
}

/// One page of stored findings.
#[derive(Debug, Clone, PartialEq)]
pub struct FindingPage<T> {
    /// Findings on this page.
    pub items: Vec<T>,
    /// Total matching findings.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub page_size: u32,
}

/// Number of findings at one severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityCount {
    /// Severity.
    pub severity: AuditSeverity,
    /// Findings at that severity.
    pub count: u64,
}
