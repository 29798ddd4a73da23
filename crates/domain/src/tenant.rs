use auditrail_core::{AppError, AppResult, TenantId};

/// Prefix shared by every tenant partition (schema) name.
pub const TENANT_SCHEMA_PREFIX: &str = "tenant_";

/// Tenant identity as resolved from the tenant registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantDescriptor {
    id: TenantId,
    subdomain: String,
    schema_name: String,
    display_name: String,
    is_active: bool,
}

impl TenantDescriptor {
    /// Creates a validated tenant descriptor. The subdomain is normalised to lower case.
    pub fn new(
        id: TenantId,
        subdomain: impl AsRef<str>,
        schema_name: impl Into<String>,
        display_name: impl Into<String>,
        is_active: bool,
    ) -> AppResult<Self> {
        let subdomain = normalize_subdomain(subdomain.as_ref());
        if subdomain.is_empty() {
            return Err(AppError::Validation(
                "tenant subdomain must not be empty".to_owned(),
            ));
        }

        let schema_name = schema_name.into();
        if !is_tenant_schema_name(schema_name.as_str()) {
            return Err(AppError::Validation(format!(
                "tenant schema '{schema_name}' must match '{TENANT_SCHEMA_PREFIX}<lowercase alphanumerics>'"
            )));
        }

        Ok(Self {
            id,
            subdomain,
            schema_name,
            display_name: display_name.into(),
            is_active,
        })
    }

    /// Returns the tenant identifier.
    #[must_use]
    pub fn id(&self) -> TenantId {
        self.id
    }

    /// Returns the normalised subdomain.
    #[must_use]
    pub fn subdomain(&self) -> &str {
        self.subdomain.as_str()
    }

    /// Returns the partition (schema) holding the tenant's data.
    #[must_use]
    pub fn schema_name(&self) -> &str {
        self.schema_name.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns whether the tenant may currently be served.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

/// Normalises a subdomain for lookup: trimmed and ASCII lower-cased.
#[must_use]
pub fn normalize_subdomain(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

fn is_tenant_schema_name(value: &str) -> bool {
    value.strip_prefix(TENANT_SCHEMA_PREFIX).is_some_and(|suffix| {
        !suffix.is_empty()
            && suffix
                .chars()
                .all(|character| character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_')
    })
}

#[cfg(test)]
mod tests {
    use auditrail_core::TenantId;

    use super::TenantDescriptor;

    #[test]
    fn subdomain_is_normalised() {
        let tenant = TenantDescriptor::new(TenantId::new(), "  Acme ", "tenant_acme", "Acme", true);
        assert!(matches!(tenant, Ok(value) if value.subdomain() == "acme"));
    }

    #[test]
    fn schema_name_must_use_tenant_prefix() {
        let tenant = TenantDescriptor::new(TenantId::new(), "acme", "public", "Acme", true);
        assert!(tenant.is_err());
    }

    #[test]
    fn empty_subdomain_is_rejected() {
        let tenant = TenantDescriptor::new(TenantId::new(), "   ", "tenant_acme", "Acme", true);
        assert!(tenant.is_err());
    }
}
