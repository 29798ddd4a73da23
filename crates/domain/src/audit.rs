use std::fmt::{Display, Formatter};
use std::str::FromStr;

use auditrail_core::{AppError, AppResult, TenantId, UserId};
use chrono::{DateTime, SubsecRound, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::change::ChangeOperation;
use crate::checksum::{STORAGE_SUBSECOND_DIGITS, compute_checksum};

/// Broad classification of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditCategory {
    /// Mutation of business data.
    DataChange,
    /// Authorization decisions, integrity findings and other security events.
    Security,
    /// Authentication lifecycle events.
    Auth,
}

impl AuditCategory {
    /// Returns a stable storage value for this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataChange => "data_change",
            Self::Security => "security",
            Self::Auth => "auth",
        }
    }

    /// Returns all categories.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::DataChange, Self::Security, Self::Auth]
    }
}

impl FromStr for AuditCategory {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown audit category '{value}'")))
    }
}

/// Severity of an audit record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuditSeverity {
    /// Routine activity.
    Info,
    /// Sensitive or destructive activity.
    Warning,
    /// Activity that needs prompt review.
    Critical,
    /// Integrity or security emergency.
    Emergency,
}

impl AuditSeverity {
    /// Returns a stable storage value for this severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Emergency => "emergency",
        }
    }

    /// Returns all severities in ascending order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::Info, Self::Warning, Self::Critical, Self::Emergency]
    }

    /// Returns whether this severity is at or above `threshold`.
    #[must_use]
    pub fn at_least(&self, threshold: Self) -> bool {
        *self >= threshold
    }
}

impl FromStr for AuditSeverity {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|severity| severity.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown audit severity '{value}'")))
    }
}

/// Entity kinds that carry a dedicated action classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifiedEntity {
    /// Employee master data.
    Employee,
    /// Tenant registry entry.
    Tenant,
    /// Leave request.
    LeaveRequest,
    /// Leave allocation.
    LeaveAllocation,
    /// Department.
    Department,
    /// Payroll record.
    Payroll,
    /// Attendance record.
    Attendance,
    /// Timesheet entry.
    Timesheet,
    /// Performance review.
    PerformanceReview,
}

impl ClassifiedEntity {
    const ALL: &'static [Self] = &[
        Self::Employee,
        Self::Tenant,
        Self::LeaveRequest,
        Self::LeaveAllocation,
        Self::Department,
        Self::Payroll,
        Self::Attendance,
        Self::Timesheet,
        Self::PerformanceReview,
    ];

    /// Returns the action prefix for this entity kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Tenant => "tenant",
            Self::LeaveRequest => "leave_request",
            Self::LeaveAllocation => "leave_allocation",
            Self::Department => "department",
            Self::Payroll => "payroll",
            Self::Attendance => "attendance",
            Self::Timesheet => "timesheet",
            Self::PerformanceReview => "performance_review",
        }
    }

    /// Classifies an entity kind name (case-insensitive), accepting the short and record-suffixed spellings.
    #[must_use]
    pub fn from_entity_kind(kind: &str) -> Option<Self> {
        let normalized = kind.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "employee" => Some(Self::Employee),
            "tenant" => Some(Self::Tenant),
            "leave" | "leaverequest" => Some(Self::LeaveRequest),
            "leaveallocation" => Some(Self::LeaveAllocation),
            "department" => Some(Self::Department),
            "payroll" | "payrollrecord" => Some(Self::Payroll),
            "attendance" | "attendancerecord" => Some(Self::Attendance),
            "timesheet" | "timesheetentry" => Some(Self::Timesheet),
            "performancereview" => Some(Self::PerformanceReview),
            _ => None,
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|entity| entity.as_str() == prefix)
    }
}

/// Action recorded by an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditActionType {
    /// Change to an entity kind without a dedicated classification.
    Record(ChangeOperation),
    /// Change to a classified entity kind.
    Entity(ClassifiedEntity, ChangeOperation),
    /// Successful sign-in.
    LoginSucceeded,
    /// Failed sign-in attempt.
    LoginFailed,
    /// Sign-out.
    Logout,
    /// Authorization gate rejected an operation.
    PermissionDenied,
    /// Bulk data export.
    DataExported,
    /// Actor role changed.
    RoleChanged,
    /// Capability granted to an actor.
    PermissionGranted,
    /// Capability revoked from an actor.
    PermissionRevoked,
    /// Anomaly rules flagged suspicious activity.
    SuspiciousActivityDetected,
    /// Stored records failed checksum verification.
    IntegrityViolationDetected,
}

impl AuditActionType {
    /// Classifies a tracked change: a dedicated classification when the entity kind has one,
    /// the generic record classification otherwise.
    #[must_use]
    pub fn for_change(entity_kind: &str, operation: ChangeOperation) -> Self {
        ClassifiedEntity::from_entity_kind(entity_kind)
            .map(|entity| Self::Entity(entity, operation))
            .unwrap_or(Self::Record(operation))
    }

    /// Returns the change operation for data-change actions.
    #[must_use]
    pub fn change_operation(&self) -> Option<ChangeOperation> {
        match self {
            Self::Record(operation) | Self::Entity(_, operation) => Some(*operation),
            _ => None,
        }
    }

    /// Returns whether this action alters an actor's privileges.
    #[must_use]
    pub fn is_privilege_change(&self) -> bool {
        matches!(
            self,
            Self::RoleChanged | Self::PermissionGranted | Self::PermissionRevoked
        )
    }

    fn fixed_value(&self) -> Option<&'static str> {
        match self {
            Self::Record(_) | Self::Entity(_, _) => None,
            Self::LoginSucceeded => Some("auth.login_succeeded"),
            Self::LoginFailed => Some("auth.login_failed"),
            Self::Logout => Some("auth.logout"),
            Self::PermissionDenied => Some("security.permission_denied"),
            Self::DataExported => Some("data.exported"),
            Self::RoleChanged => Some("security.role_changed"),
            Self::PermissionGranted => Some("security.permission_granted"),
            Self::PermissionRevoked => Some("security.permission_revoked"),
            Self::SuspiciousActivityDetected => Some("security.suspicious_activity_detected"),
            Self::IntegrityViolationDetected => Some("security.integrity_violation_detected"),
        }
    }

    const FIXED: &'static [Self] = &[
        Self::LoginSucceeded,
        Self::LoginFailed,
        Self::Logout,
        Self::PermissionDenied,
        Self::DataExported,
        Self::RoleChanged,
        Self::PermissionGranted,
        Self::PermissionRevoked,
        Self::SuspiciousActivityDetected,
        Self::IntegrityViolationDetected,
    ];
}

impl Display for AuditActionType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Record(operation) => write!(formatter, "record.{}", operation.as_str()),
            Self::Entity(entity, operation) => {
                write!(formatter, "{}.{}", entity.as_str(), operation.as_str())
            }
            fixed => formatter.write_str(fixed.fixed_value().unwrap_or_default()),
        }
    }
}

impl FromStr for AuditActionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some(fixed) = Self::FIXED
            .iter()
            .copied()
            .find(|action| action.fixed_value() == Some(value))
        {
            return Ok(fixed);
        }

        let parsed = value.split_once('.').and_then(|(prefix, operation)| {
            let operation = ChangeOperation::parse(operation)?;
            if prefix == "record" {
                return Some(Self::Record(operation));
            }
            ClassifiedEntity::from_prefix(prefix).map(|entity| Self::Entity(entity, operation))
        });

        parsed.ok_or_else(|| AppError::Validation(format!("unknown audit action '{value}'")))
    }
}

/// Request-scoped context attached to a record when the change happened inside a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// Client IP address.
    pub ip_address: Option<String>,
    /// HTTP method.
    pub http_method: Option<String>,
    /// Request path.
    pub request_path: Option<String>,
    /// Raw query string.
    pub query_string: Option<String>,
    /// Correlation id propagated across services.
    pub correlation_id: Option<String>,
    /// Session identifier.
    pub session_id: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}

/// Mutable record under construction. Sealing it computes the checksum and freezes it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecordDraft {
    /// Record identifier.
    pub id: Uuid,
    /// Event time.
    pub occurred_at: DateTime<Utc>,
    /// Owning tenant; absent for platform-level events.
    pub tenant_id: Option<TenantId>,
    /// Acting user id.
    pub actor_id: Option<UserId>,
    /// Acting user email.
    pub actor_email: Option<String>,
    /// Acting user role label.
    pub actor_role: Option<String>,
    /// Recorded action.
    pub action: AuditActionType,
    /// Record category.
    pub category: AuditCategory,
    /// Record severity.
    pub severity: AuditSeverity,
    /// Subject entity kind.
    pub subject_type: String,
    /// Subject entity id.
    pub subject_id: Option<String>,
    /// Whether the recorded operation succeeded.
    pub success: bool,
    /// Failure detail when `success` is false.
    pub error_message: Option<String>,
    /// State before the change; absent on create.
    pub old_values: Option<Value>,
    /// State after the change; absent on delete.
    pub new_values: Option<Value>,
    /// Names of changed fields.
    pub changed_fields: Vec<String>,
    /// Request context.
    pub request: RequestMetadata,
    /// Free-form structured metadata.
    pub metadata: Option<Value>,
}

impl AuditRecordDraft {
    /// Starts a successful draft stamped with the current time.
    #[must_use]
    pub fn new(
        action: AuditActionType,
        category: AuditCategory,
        severity: AuditSeverity,
        subject_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            tenant_id: None,
            actor_id: None,
            actor_email: None,
            actor_role: None,
            action,
            category,
            severity,
            subject_type: subject_type.into(),
            subject_id: None,
            success: true,
            error_message: None,
            old_values: None,
            new_values: None,
            changed_fields: Vec::new(),
            request: RequestMetadata::default(),
            metadata: None,
        }
    }

    /// Truncates the timestamp to storage precision and computes the integrity checksum.
    #[must_use]
    pub fn seal(mut self) -> AuditRecord {
        self.occurred_at = self.occurred_at.trunc_subsecs(STORAGE_SUBSECOND_DIGITS);
        let checksum = compute_checksum(
            &self.action.to_string(),
            self.subject_type.as_str(),
            self.subject_id.as_deref(),
            self.occurred_at,
            self.actor_id,
        );

        AuditRecord {
            draft: self,
            checksum,
        }
    }
}

/// Immutable, checksummed audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    draft: AuditRecordDraft,
    checksum: String,
}

impl AuditRecord {
    /// Rebuilds a record read back from storage with its stored checksum.
    pub fn restore(draft: AuditRecordDraft, checksum: impl Into<String>) -> AppResult<Self> {
        let checksum = checksum.into();
        if checksum.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "audit record '{}' has no checksum",
                draft.id
            )));
        }

        Ok(Self { draft, checksum })
    }

    /// Returns whether the stored checksum matches one recomputed from the record's fields.
    #[must_use]
    pub fn verify_checksum(&self) -> bool {
        let expected = compute_checksum(
            &self.draft.action.to_string(),
            self.draft.subject_type.as_str(),
            self.draft.subject_id.as_deref(),
            self.draft.occurred_at,
            self.draft.actor_id,
        );
        expected == self.checksum
    }

    /// Returns the record id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.draft.id
    }

    /// Returns the event time at storage precision.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.draft.occurred_at
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.draft.tenant_id
    }

    /// Returns the acting user id.
    #[must_use]
    pub fn actor_id(&self) -> Option<UserId> {
        self.draft.actor_id
    }

    /// Returns the acting user email.
    #[must_use]
    pub fn actor_email(&self) -> Option<&str> {
        self.draft.actor_email.as_deref()
    }

    /// Returns the acting user role.
    #[must_use]
    pub fn actor_role(&self) -> Option<&str> {
        self.draft.actor_role.as_deref()
    }

    /// Returns the action.
    #[must_use]
    pub fn action(&self) -> AuditActionType {
        self.draft.action
    }

    /// Returns the category.
    #[must_use]
    pub fn category(&self) -> AuditCategory {
        self.draft.category
    }

    /// Returns the severity.
    #[must_use]
    pub fn severity(&self) -> AuditSeverity {
        self.draft.severity
    }

    /// Returns the subject entity kind.
    #[must_use]
    pub fn subject_type(&self) -> &str {
        self.draft.subject_type.as_str()
    }

    /// Returns the subject entity id.
    #[must_use]
    pub fn subject_id(&self) -> Option<&str> {
        self.draft.subject_id.as_deref()
    }

    /// Returns whether the recorded operation succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.draft.success
    }

    /// Returns the failure detail.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.draft.error_message.as_deref()
    }

    /// Returns the redacted state before the change.
    #[must_use]
    pub fn old_values(&self) -> Option<&Value> {
        self.draft.old_values.as_ref()
    }

    /// Returns the redacted state after the change.
    #[must_use]
    pub fn new_values(&self) -> Option<&Value> {
        self.draft.new_values.as_ref()
    }

    /// Returns changed field names.
    #[must_use]
    pub fn changed_fields(&self) -> &[String] {
        self.draft.changed_fields.as_slice()
    }

    /// Returns request context.
    #[must_use]
    pub fn request(&self) -> &RequestMetadata {
        &self.draft.request
    }

    /// Returns structured metadata.
    #[must_use]
    pub fn metadata(&self) -> Option<&Value> {
        self.draft.metadata.as_ref()
    }

    /// Returns the stored integrity checksum.
    #[must_use]
    pub fn checksum(&self) -> &str {
        self.checksum.as_str()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use auditrail_core::UserId;
    use chrono::{TimeZone, Timelike, Utc};

    use super::{
        AuditActionType, AuditCategory, AuditRecord, AuditRecordDraft, AuditSeverity,
        ClassifiedEntity,
    };
    use crate::change::ChangeOperation;

    #[test]
    fn classified_entities_accept_record_suffixed_kinds() {
        assert_eq!(
            AuditActionType::for_change("PayrollRecord", ChangeOperation::Updated),
            AuditActionType::Entity(ClassifiedEntity::Payroll, ChangeOperation::Updated)
        );
        assert_eq!(
            AuditActionType::for_change("LEAVE", ChangeOperation::Created),
            AuditActionType::Entity(ClassifiedEntity::LeaveRequest, ChangeOperation::Created)
        );
        assert_eq!(
            AuditActionType::for_change("Invoice", ChangeOperation::Deleted),
            AuditActionType::Record(ChangeOperation::Deleted)
        );
    }

    #[test]
    fn action_storage_values_parse_back() {
        let actions = [
            AuditActionType::Record(ChangeOperation::Created),
            AuditActionType::Entity(ClassifiedEntity::PerformanceReview, ChangeOperation::Deleted),
            AuditActionType::PermissionDenied,
            AuditActionType::IntegrityViolationDetected,
        ];

        for action in actions {
            let parsed = AuditActionType::from_str(&action.to_string());
            assert!(matches!(parsed, Ok(value) if value == action));
        }
        assert!(AuditActionType::from_str("employee.archived").is_err());
    }

    #[test]
    fn severity_is_ordered() {
        assert!(AuditSeverity::Critical.at_least(AuditSeverity::Warning));
        assert!(!AuditSeverity::Info.at_least(AuditSeverity::Warning));
    }

    #[test]
    fn sealing_truncates_to_microseconds_and_verifies() {
        let mut draft = AuditRecordDraft::new(
            AuditActionType::Entity(ClassifiedEntity::Employee, ChangeOperation::Created),
            AuditCategory::DataChange,
            AuditSeverity::Warning,
            "Employee",
        );
        draft.occurred_at = Utc
            .with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
            .with_nanosecond(123_456_789)
            .unwrap_or_else(Utc::now);
        draft.actor_id = Some(UserId::new());
        draft.subject_id = Some("42".to_owned());

        let record = draft.seal();
        assert_eq!(record.occurred_at().nanosecond(), 123_456_000);
        assert!(record.verify_checksum());
    }

    #[test]
    fn restored_record_with_altered_subject_fails_verification() {
        let mut draft = AuditRecordDraft::new(
            AuditActionType::Record(ChangeOperation::Updated),
            AuditCategory::DataChange,
            AuditSeverity::Info,
            "Asset",
        );
        draft.subject_id = Some("7".to_owned());
        let record = draft.seal();

        let mut tampered = record.draft.clone();
        tampered.subject_id = Some("8".to_owned());
        let restored = AuditRecord::restore(tampered, record.checksum());

        assert!(matches!(restored, Ok(value) if !value.verify_checksum()));
    }

    #[test]
    fn restore_requires_checksum() {
        let draft = AuditRecordDraft::new(
            AuditActionType::Logout,
            AuditCategory::Auth,
            AuditSeverity::Info,
            "Session",
        );
        assert!(AuditRecord::restore(draft, " ").is_err());
    }
}
