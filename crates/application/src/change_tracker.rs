use std::sync::Arc;

use auditrail_core::{AppError, AppResult, TenantId};
use auditrail_domain::{ChangeOperation, TrackedChange, TrackedField};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::change_capture_service::ChangeCaptureService;
use crate::storage_ports::EntityStore;

/// Entity whose mutations are tracked for audit.
pub trait AuditableEntity: Serialize {
    /// Entity kind, e.g. `Employee`.
    fn entity_kind(&self) -> &str;

    /// Primary key rendered as text, when assigned.
    fn entity_id(&self) -> Option<String>;

    /// Owning tenant, when the entity is tenant-scoped.
    fn tenant_id(&self) -> Option<TenantId> {
        None
    }

    /// Serialized names of fields that reference other entities.
    fn foreign_key_fields(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Collects entity changes of one unit of work in tracking order.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    changes: Vec<TrackedChange>,
}

impl ChangeTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks an insert.
    pub fn track_created<E: AuditableEntity>(&mut self, entity: &E) -> AppResult<()> {
        let current = serialize_fields(entity)?;
        let foreign_keys = entity.foreign_key_fields();
        let fields = current
            .into_iter()
            .map(|(name, value)| TrackedField {
                is_foreign_key: foreign_keys.contains(&name.as_str()),
                name,
                original: None,
                current: Some(value),
                is_modified: true,
            })
            .collect();

        self.changes.push(tracked(entity, ChangeOperation::Created, fields));
        Ok(())
    }

    /// Tracks an update by comparing serialized fields. Returns `false` and tracks
    /// nothing when no field differs.
    pub fn track_updated<E: AuditableEntity>(&mut self, before: &E, after: &E) -> AppResult<bool> {
        if before.entity_kind() != after.entity_kind() || before.entity_id() != after.entity_id() {
            return Err(AppError::Validation(format!(
                "cannot track update from '{}' to '{}': entity identity differs",
                before.entity_kind(),
                after.entity_kind()
            )));
        }

        let mut original = serialize_fields(before)?;
        let current = serialize_fields(after)?;
        let foreign_keys = after.foreign_key_fields();

        let mut fields: Vec<TrackedField> = current
            .into_iter()
            .map(|(name, current)| {
                let original = original.remove(&name);
                TrackedField {
                    is_modified: original.as_ref() != Some(&current),
                    is_foreign_key: foreign_keys.contains(&name.as_str()),
                    name,
                    original,
                    current: Some(current),
                }
            })
            .collect();
        fields.extend(original.into_iter().map(|(name, original)| TrackedField {
            is_foreign_key: foreign_keys.contains(&name.as_str()),
            name,
            original: Some(original),
            current: None,
            is_modified: true,
        }));

        if !fields.iter().any(|field| field.is_modified) {
            return Ok(false);
        }

        self.changes.push(tracked(after, ChangeOperation::Updated, fields));
        Ok(true)
    }

    /// Tracks a delete.
    pub fn track_deleted<E: AuditableEntity>(&mut self, entity: &E) -> AppResult<()> {
        let original = serialize_fields(entity)?;
        let foreign_keys = entity.foreign_key_fields();
        let fields = original
            .into_iter()
            .map(|(name, value)| TrackedField {
                is_foreign_key: foreign_keys.contains(&name.as_str()),
                name,
                original: Some(value),
                current: None,
                is_modified: false,
            })
            .collect();

        self.changes.push(tracked(entity, ChangeOperation::Deleted, fields));
        Ok(())
    }

    /// Returns tracked changes in order.
    #[must_use]
    pub fn changes(&self) -> &[TrackedChange] {
        self.changes.as_slice()
    }

    /// Returns whether nothing has been tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Consumes the tracker, returning its changes.
    #[must_use]
    pub fn into_changes(self) -> Vec<TrackedChange> {
        self.changes
    }
}

fn tracked<E: AuditableEntity>(
    entity: &E,
    operation: ChangeOperation,
    fields: Vec<TrackedField>,
) -> TrackedChange {
    TrackedChange {
        entity_kind: entity.entity_kind().to_owned(),
        entity_id: entity.entity_id(),
        tenant_id: entity.tenant_id(),
        operation,
        fields,
    }
}

fn serialize_fields<E: AuditableEntity>(entity: &E) -> AppResult<Map<String, Value>> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(AppError::Validation(format!(
            "entity '{}' does not serialize to an object",
            entity.entity_kind()
        ))),
        Err(error) => Err(AppError::Internal(format!(
            "failed to serialize entity '{}': {error}",
            entity.entity_kind()
        ))),
    }
}

/// Storage decorator that routes every unit of work through change capture.
#[derive(Clone)]
pub struct AuditedEntityStore {
    inner: Arc<dyn EntityStore>,
    capture: Arc<ChangeCaptureService>,
}

impl AuditedEntityStore {
    /// Wraps a store.
    #[must_use]
    pub fn new(inner: Arc<dyn EntityStore>, capture: Arc<ChangeCaptureService>) -> Self {
        Self { inner, capture }
    }

    /// Snapshots the tracked changes, persists them, then publishes the audit records.
    ///
    /// The store's result is returned unchanged; capture never alters it.
    pub async fn commit(&self, tracker: ChangeTracker) -> AppResult<()> {
        if tracker.is_empty() {
            return Ok(());
        }

        let changes = tracker.into_changes();
        let captured = self.capture.snapshot(&changes);
        let result = self.inner.persist(&changes).await;
        self.capture.publish(captured, result.as_ref().err());
        result
    }
}
