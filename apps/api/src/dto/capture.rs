use auditrail_core::{AppError, TenantId};
use auditrail_domain::{ChangeOperation, TrackedChange, TrackedField};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Entity changes committed by an upstream service, in tracking order.
#[derive(Debug, Deserialize)]
pub struct CaptureChangesRequest {
    pub changes: Vec<TrackedChangeRequest>,
}

#[derive(Debug, Deserialize)]
pub struct TrackedChangeRequest {
    pub entity_kind: String,
    pub entity_id: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub operation: String,
    #[serde(default)]
    pub fields: Vec<TrackedFieldRequest>,
}

#[derive(Debug, Deserialize)]
pub struct TrackedFieldRequest {
    pub name: String,
    pub original: Option<Value>,
    pub current: Option<Value>,
    #[serde(default)]
    pub is_modified: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
}

#[derive(Debug, Serialize)]
pub struct CaptureChangesResponse {
    pub captured: usize,
}

impl TryFrom<TrackedChangeRequest> for TrackedChange {
    type Error = AppError;

    fn try_from(value: TrackedChangeRequest) -> Result<Self, Self::Error> {
        let operation = ChangeOperation::parse(value.operation.trim()).ok_or_else(|| {
            AppError::Validation(format!(
                "unknown change operation '{}'",
                value.operation
            ))
        })?;

        Ok(Self {
            entity_kind: value.entity_kind,
            entity_id: value.entity_id,
            tenant_id: value.tenant_id.map(TenantId::from_uuid),
            operation,
            fields: value
                .fields
                .into_iter()
                .map(|field| TrackedField {
                    name: field.name,
                    original: field.original,
                    current: field.current,
                    is_modified: field.is_modified,
                    is_foreign_key: field.is_foreign_key,
                })
                .collect(),
        })
    }
}
