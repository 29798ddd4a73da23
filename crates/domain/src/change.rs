use auditrail_core::TenantId;
use serde_json::Value;

/// Kind of mutation observed on a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOperation {
    /// Entity was inserted.
    Created,
    /// Entity was modified.
    Updated,
    /// Entity was removed.
    Deleted,
}

impl ChangeOperation {
    /// Returns a stable storage value for this operation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    /// Parses a storage value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// One property of a tracked entity, with its value before and after the unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedField {
    /// Property name as serialized.
    pub name: String,
    /// Value loaded from storage; absent for inserts.
    pub original: Option<Value>,
    /// Value about to be written; absent for deletes.
    pub current: Option<Value>,
    /// Whether the unit of work modified this property.
    pub is_modified: bool,
    /// Whether the property is a foreign key to another entity.
    pub is_foreign_key: bool,
}

/// Snapshot of one entity mutation taken before the unit of work commits.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedChange {
    /// Entity kind, e.g. `Employee`.
    pub entity_kind: String,
    /// Primary key rendered as text, when known.
    pub entity_id: Option<String>,
    /// Owning tenant, when the entity carries one.
    pub tenant_id: Option<TenantId>,
    /// Observed operation.
    pub operation: ChangeOperation,
    /// Properties in tracking order.
    pub fields: Vec<TrackedField>,
}

impl TrackedChange {
    /// Returns names of modified properties, in tracking order.
    pub fn modified_field_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|field| field.is_modified)
            .map(|field| field.name.as_str())
    }
}
