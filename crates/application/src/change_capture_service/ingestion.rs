use auditrail_core::{ActorIdentity, AppError, AppResult};
use auditrail_domain::{Capability, TrackedChange};

use crate::authorization_gate::{AuthorizationGate, ProtectedOperation};

use super::ChangeCaptureService;

#[cfg(test)]
mod tests;

/// Accepts committed changes reported by upstream services.
///
/// Reporters need `audit.ingest` or `audit.admin`. A tenant-bound reporter can
/// only report changes for its own tenant.
#[derive(Clone)]
pub struct ChangeIngestionService {
    capture: ChangeCaptureService,
    authorization_gate: AuthorizationGate,
}

impl ChangeIngestionService {
    /// Creates the service.
    #[must_use]
    pub fn new(capture: ChangeCaptureService, authorization_gate: AuthorizationGate) -> Self {
        Self {
            capture,
            authorization_gate,
        }
    }

    /// Authorizes the reporter, scopes each change to its tenant and captures them.
    pub async fn ingest(
        &self,
        actor: &ActorIdentity,
        mut changes: Vec<TrackedChange>,
    ) -> AppResult<usize> {
        self.authorization_gate
            .authorize(
                actor,
                &ProtectedOperation::new(
                    "audit.changes.ingest",
                    [Capability::AuditIngest, Capability::AuditAdmin],
                ),
            )
            .await?;

        for change in &mut changes {
            change.tenant_id = match (actor.tenant_id(), change.tenant_id) {
                (Some(own), Some(other)) if own != other => {
                    return Err(AppError::Forbidden(
                        "changes may only be reported for the actor's own tenant".to_owned(),
                    ));
                }
                (Some(own), _) => Some(own),
                (None, requested) => requested,
            };
        }

        Ok(self.capture.capture(&changes))
    }
}
