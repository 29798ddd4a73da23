use std::fmt::{Display, Formatter};
use std::str::FromStr;

use auditrail_core::AppError;
use serde::{Deserialize, Serialize};

/// Capabilities an actor may hold; protected operations declare the set they require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Allows reading employee records.
    EmployeesRead,
    /// Allows mutating employee records.
    EmployeesWrite,
    /// Allows reading payroll and compensation data.
    PayrollRead,
    /// Allows mutating payroll and compensation data.
    PayrollWrite,
    /// Allows managing tenant lifecycle and identity fields.
    TenantsManage,
    /// Allows reading the audit trail.
    AuditRead,
    /// Allows bulk export of the audit trail.
    AuditExport,
    /// Allows reporting committed entity changes into the audit trail.
    AuditIngest,
    /// Full audit administration, including integrity verification.
    AuditAdmin,
    /// Allows reviewing and resolving security alerts.
    SecurityAlertsManage,
}

impl Capability {
    /// Returns a stable storage value for this capability.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmployeesRead => "employees.read",
            Self::EmployeesWrite => "employees.write",
            Self::PayrollRead => "payroll.read",
            Self::PayrollWrite => "payroll.write",
            Self::TenantsManage => "tenants.manage",
            Self::AuditRead => "audit.read",
            Self::AuditExport => "audit.export",
            Self::AuditIngest => "audit.ingest",
            Self::AuditAdmin => "audit.admin",
            Self::SecurityAlertsManage => "security.alerts.manage",
        }
    }

    /// Returns all known capabilities.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Capability] = &[
            Capability::EmployeesRead,
            Capability::EmployeesWrite,
            Capability::PayrollRead,
            Capability::PayrollWrite,
            Capability::TenantsManage,
            Capability::AuditRead,
            Capability::AuditExport,
            Capability::AuditIngest,
            Capability::AuditAdmin,
            Capability::SecurityAlertsManage,
        ];

        ALL
    }
}

impl Display for Capability {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|capability| capability.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown capability value '{value}'")))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::Capability;

    #[test]
    fn capability_roundtrip_storage_value() {
        for capability in Capability::all() {
            let restored = Capability::from_str(capability.as_str());
            assert!(matches!(restored, Ok(value) if value == *capability));
        }
    }

    #[test]
    fn unknown_capability_is_rejected() {
        assert!(Capability::from_str("audit.delete").is_err());
    }
}
