use std::sync::Arc;

use async_trait::async_trait;
use auditrail_core::{ActorIdentity, AppError, AppResult};
use auditrail_domain::{
    AuditActionType, AuditCategory, AuditRecordDraft, AuditSeverity, Capability,
};
use serde_json::json;
use tracing::warn;

use crate::audit_ports::AuditEventSink;
use crate::request_context::RequestContextSource;

#[cfg(test)]
mod tests;

const DENIAL_PREFIX: &str = "requires one of: ";

/// Returns the capability values listed by a denial raised by [`AuthorizationGate`].
#[must_use]
pub fn denied_capabilities(error: &AppError) -> Option<Vec<String>> {
    let AppError::Forbidden(message) = error else {
        return None;
    };
    let listed = message.strip_prefix(DENIAL_PREFIX)?;
    Some(listed.split(", ").map(str::to_owned).collect())
}

/// External permission lookup.
#[async_trait]
pub trait PermissionLookup: Send + Sync {
    /// Returns whether the actor holds the capability.
    async fn has_permission(&self, actor: &ActorIdentity, capability: Capability) -> AppResult<bool>;
}

/// A protected operation and the capabilities that unlock it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedOperation {
    /// Stable operation name, e.g. `audit.logs.query`.
    pub endpoint: String,
    /// Holding any one of these grants access. Empty means unrestricted.
    pub required: Vec<Capability>,
}

impl ProtectedOperation {
    /// Declares an operation.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, required: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            endpoint: endpoint.into(),
            required: required.into_iter().collect(),
        }
    }

    /// Returns required capability values, for denial responses.
    #[must_use]
    pub fn required_values(&self) -> Vec<&'static str> {
        self.required.iter().map(Capability::as_str).collect()
    }
}

/// Capability gate in front of protected operations.
///
/// Grants write nothing. Each denial submits exactly one security record to the
/// audit pipeline and is returned as `Forbidden`.
#[derive(Clone)]
pub struct AuthorizationGate {
    lookup: Arc<dyn PermissionLookup>,
    sink: Arc<dyn AuditEventSink>,
    context: Arc<dyn RequestContextSource>,
}

impl AuthorizationGate {
    /// Creates the gate.
    #[must_use]
    pub fn new(
        lookup: Arc<dyn PermissionLookup>,
        sink: Arc<dyn AuditEventSink>,
        context: Arc<dyn RequestContextSource>,
    ) -> Self {
        Self {
            lookup,
            sink,
            context,
        }
    }

    /// Ensures the actor holds at least one required capability.
    ///
    /// Lookup failures propagate without writing a denial.
    pub async fn authorize(
        &self,
        actor: &ActorIdentity,
        operation: &ProtectedOperation,
    ) -> AppResult<()> {
        if operation.required.is_empty() {
            return Ok(());
        }

        for capability in &operation.required {
            if self.lookup.has_permission(actor, *capability).await? {
                return Ok(());
            }
        }

        self.record_denial(actor, operation);
        Err(AppError::Forbidden(format!(
            "{DENIAL_PREFIX}{}",
            operation.required_values().join(", ")
        )))
    }

    fn record_denial(&self, actor: &ActorIdentity, operation: &ProtectedOperation) {
        let context = self.context.current();
        let http_method = context.as_ref().and_then(|context| context.http_method.clone());
        let path = context.as_ref().and_then(|context| context.path.clone());

        warn!(
            actor_id = %actor.user_id(),
            endpoint = %operation.endpoint,
            required = ?operation.required_values(),
            "permission denied"
        );

        let mut draft = AuditRecordDraft::new(
            AuditActionType::PermissionDenied,
            AuditCategory::Security,
            AuditSeverity::Warning,
            "Endpoint",
        );
        draft.subject_id = Some(operation.endpoint.clone());
        draft.tenant_id = actor.tenant_id();
        draft.actor_id = Some(actor.user_id());
        draft.actor_email = actor.email().map(str::to_owned);
        draft.actor_role = actor.role().map(str::to_owned);
        draft.success = false;
        draft.error_message = Some("missing required capability".to_owned());
        draft.metadata = Some(json!({
            "endpoint": operation.endpoint,
            "required_capabilities": operation.required_values(),
            "actor_email": actor.email(),
            "http_method": http_method,
            "path": path,
        }));
        if let Some(context) = context {
            draft.request = context.to_metadata();
        }

        self.sink.submit(draft.seal());
    }
}
