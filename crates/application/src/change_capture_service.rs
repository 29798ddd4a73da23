use std::sync::Arc;

use auditrail_core::{AppError, AppResult};
use auditrail_domain::{
    AuditActionType, AuditCategory, AuditRecordDraft, AuditSeverity, ChangeOperation,
    TrackedChange,
};
use tracing::{debug, warn};

use crate::audit_ports::AuditEventSink;
use crate::request_context::{RequestContext, RequestContextSource};

mod ingestion;
mod payload;
mod policy;


pub use ingestion::ChangeIngestionService;
pub use policy::{CapturePolicy, REDACTION_MARKER};

const CAPTURE_FAILURE_MESSAGE: &str = "Failed to capture full audit details";

/// Drafts snapshotted before commit, published once the commit outcome is known.
#[derive(Debug, Clone, Default)]
pub struct CapturedChanges {
    drafts: Vec<AuditRecordDraft>,
}

impl CapturedChanges {
    /// Returns the number of captured changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    /// Returns whether nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

/// Turns tracked entity changes into sealed audit records and submits them to the pipeline.
///
/// Capture never fails the unit of work it observes and performs no I/O beyond a
/// non-blocking submit.
#[derive(Clone)]
pub struct ChangeCaptureService {
    policy: Arc<CapturePolicy>,
    sink: Arc<dyn AuditEventSink>,
    context: Arc<dyn RequestContextSource>,
}

impl ChangeCaptureService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        policy: Arc<CapturePolicy>,
        sink: Arc<dyn AuditEventSink>,
        context: Arc<dyn RequestContextSource>,
    ) -> Self {
        Self {
            policy,
            sink,
            context,
        }
    }

    /// Snapshots changes, in tracking order, before the unit of work commits.
    #[must_use]
    pub fn snapshot(&self, changes: &[TrackedChange]) -> CapturedChanges {
        let context = self.context.current();
        let drafts: Vec<AuditRecordDraft> = changes
            .iter()
            .filter(|change| !self.policy.is_excluded(change.entity_kind.as_str()))
            .map(|change| {
                self.draft_for(change, context.as_ref())
                    .unwrap_or_else(|error| fallback_draft(change, &error, context.as_ref()))
            })
            .collect();

        debug!(
            tracked = changes.len(),
            captured = drafts.len(),
            "captured entity changes"
        );
        CapturedChanges { drafts }
    }

    /// Seals and submits captured drafts. A failed commit marks every record unsuccessful.
    pub fn publish(&self, captured: CapturedChanges, commit_error: Option<&AppError>) -> usize {
        let count = captured.drafts.len();
        for mut draft in captured.drafts {
            if let Some(error) = commit_error {
                draft.success = false;
                draft.error_message = Some(format!("unit of work failed: {error}"));
            }
            self.sink.submit(draft.seal());
        }
        count
    }

    /// Snapshots and publishes in one step, for changes already committed.
    pub fn capture(&self, changes: &[TrackedChange]) -> usize {
        let captured = self.snapshot(changes);
        self.publish(captured, None)
    }

    fn draft_for(
        &self,
        change: &TrackedChange,
        context: Option<&RequestContext>,
    ) -> AppResult<AuditRecordDraft> {
        let entity_kind = change.entity_kind.trim();
        if entity_kind.is_empty() {
            return Err(AppError::Validation(
                "tracked change has no entity kind".to_owned(),
            ));
        }

        let payload = payload::build(change, &self.policy)?;
        let severity = classify_severity(change.operation, &payload.changed_fields, &self.policy);

        let mut draft = AuditRecordDraft::new(
            AuditActionType::for_change(entity_kind, change.operation),
            AuditCategory::DataChange,
            severity,
            entity_kind,
        );
        draft.subject_id = change.entity_id.clone();
        draft.tenant_id = change.tenant_id;
        draft.old_values = payload.old_values;
        draft.new_values = payload.new_values;
        draft.changed_fields = payload.changed_fields;
        enrich(&mut draft, context);

        Ok(draft)
    }
}

fn classify_severity(
    operation: ChangeOperation,
    changed_fields: &[String],
    policy: &CapturePolicy,
) -> AuditSeverity {
    if operation == ChangeOperation::Deleted
        || changed_fields
            .iter()
            .any(|field| policy.is_sensitive(field.as_str()))
    {
        AuditSeverity::Warning
    } else {
        AuditSeverity::Info
    }
}

fn enrich(draft: &mut AuditRecordDraft, context: Option<&RequestContext>) {
    let Some(context) = context else {
        return;
    };

    draft.request = context.to_metadata();
    if let Some(actor) = context.actor.as_ref() {
        draft.actor_id = Some(actor.user_id());
        draft.actor_email = actor.email().map(str::to_owned);
        draft.actor_role = actor.role().map(str::to_owned);
        if draft.tenant_id.is_none() {
            draft.tenant_id = actor.tenant_id();
        }
    }
}

fn fallback_draft(
    change: &TrackedChange,
    error: &AppError,
    context: Option<&RequestContext>,
) -> AuditRecordDraft {
    warn!(
        entity_kind = %change.entity_kind,
        error = %error,
        "change capture degraded to fallback record"
    );

    let entity_kind = match change.entity_kind.trim() {
        "" => "Unknown",
        kind => kind,
    };
    let mut draft = AuditRecordDraft::new(
        AuditActionType::Record(ChangeOperation::Updated),
        AuditCategory::DataChange,
        AuditSeverity::Warning,
        entity_kind,
    );
    draft.subject_id = change.entity_id.clone();
    draft.tenant_id = change.tenant_id;
    draft.success = false;
    draft.error_message = Some(format!("{CAPTURE_FAILURE_MESSAGE}: {error}"));
    enrich(&mut draft, context);
    draft
}
