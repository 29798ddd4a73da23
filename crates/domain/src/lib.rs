//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod change;
mod checksum;
mod security;
mod tenant;

pub use audit::{
    AuditActionType, AuditCategory, AuditRecord, AuditRecordDraft, AuditSeverity,
    ClassifiedEntity, RequestMetadata,
};
pub use change::{ChangeOperation, TrackedChange, TrackedField};
pub use checksum::{STORAGE_SUBSECOND_DIGITS, compute_checksum};
pub use security::Capability;
pub use tenant::{TENANT_SCHEMA_PREFIX, TenantDescriptor, normalize_subdomain};
