use std::collections::HashSet;

use auditrail_core::{AppError, AppResult};
use regex::Regex;

/// Marker written in place of secret field values.
pub const REDACTION_MARKER: &str = "***REDACTED***";

const EXCLUDED_ENTITY_KINDS: &[&str] = &[
    "AuditLog",
    "AuditRecord",
    "RefreshToken",
    "Session",
    "MigrationHistory",
    "_sqlx_migrations",
];

const SENSITIVE_FIELDS: &[&str] = &[
    // compensation
    "Salary",
    "BaseSalary",
    "Compensation",
    "Bonus",
    "Commission",
    // banking
    "BankAccountNumber",
    "BankName",
    "IBAN",
    "SwiftCode",
    // national identifiers
    "NationalId",
    "SSN",
    "TaxId",
    "PassportNumber",
    // medical and emergency contact
    "MedicalInfo",
    "HealthCondition",
    "EmergencyContact",
    "EmergencyPhone",
    // employment status
    "TerminationDate",
    "TerminationReason",
    "EmploymentStatus",
    "IsTerminated",
    "IsOffboarded",
    // credentials
    "PasswordHash",
    "MfaSecret",
    "BackupCodes",
    // authorization
    "Role",
    "Permissions",
    "IsActive",
    "IsAdmin",
];

const SECRET_FIELD_PATTERN: &str = "(?i)password|secret";

/// Immutable capture configuration: which entity kinds are skipped, which fields
/// raise severity, and which fields are redacted.
#[derive(Debug, Clone)]
pub struct CapturePolicy {
    excluded_entity_kinds: HashSet<String>,
    sensitive_fields: HashSet<String>,
    secret_field_pattern: Regex,
}

impl CapturePolicy {
    /// Builds the standard policy.
    pub fn standard() -> AppResult<Self> {
        Self::new(
            EXCLUDED_ENTITY_KINDS.iter().copied(),
            SENSITIVE_FIELDS.iter().copied(),
            SECRET_FIELD_PATTERN,
        )
    }

    /// Builds a policy from explicit sets. Names are matched case-insensitively.
    pub fn new<'a>(
        excluded_entity_kinds: impl IntoIterator<Item = &'a str>,
        sensitive_fields: impl IntoIterator<Item = &'a str>,
        secret_field_pattern: &str,
    ) -> AppResult<Self> {
        let secret_field_pattern = Regex::new(secret_field_pattern).map_err(|error| {
            AppError::Validation(format!("invalid secret field pattern: {error}"))
        })?;

        Ok(Self {
            excluded_entity_kinds: excluded_entity_kinds
                .into_iter()
                .map(str::to_ascii_lowercase)
                .collect(),
            sensitive_fields: sensitive_fields
                .into_iter()
                .map(str::to_ascii_lowercase)
                .collect(),
            secret_field_pattern,
        })
    }

    /// Returns a copy with additional sensitive field names.
    #[must_use]
    pub fn with_extra_sensitive_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.sensitive_fields.extend(
            fields
                .into_iter()
                .map(|field| field.as_ref().trim().to_ascii_lowercase())
                .filter(|field| !field.is_empty()),
        );
        self
    }

    /// Returns whether changes to this entity kind are never captured.
    #[must_use]
    pub fn is_excluded(&self, entity_kind: &str) -> bool {
        self.excluded_entity_kinds
            .contains(&entity_kind.to_ascii_lowercase())
    }

    /// Returns whether a change to this field raises severity.
    #[must_use]
    pub fn is_sensitive(&self, field_name: &str) -> bool {
        self.sensitive_fields
            .contains(&field_name.to_ascii_lowercase())
    }

    /// Returns whether this field's value must never be serialized.
    #[must_use]
    pub fn is_secret(&self, field_name: &str) -> bool {
        self.secret_field_pattern.is_match(field_name)
    }
}
