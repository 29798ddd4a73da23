use std::collections::HashSet;

use auditrail_core::{AppError, AppResult};
use auditrail_domain::{ChangeOperation, TrackedChange, TrackedField};
use serde_json::{Map, Value};

use super::policy::{CapturePolicy, REDACTION_MARKER};

pub(super) struct ChangePayload {
    pub(super) old_values: Option<Value>,
    pub(super) new_values: Option<Value>,
    pub(super) changed_fields: Vec<String>,
}

/// Builds redacted snapshots. Updates carry only modified fields; creates and
/// deletes carry the whole entity.
pub(super) fn build(change: &TrackedChange, policy: &CapturePolicy) -> AppResult<ChangePayload> {
    let mut seen = HashSet::with_capacity(change.fields.len());
    for field in &change.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(AppError::Validation(format!(
                "field '{}' tracked twice on '{}'",
                field.name, change.entity_kind
            )));
        }
    }

    let payload = match change.operation {
        ChangeOperation::Created => ChangePayload {
            old_values: None,
            new_values: Some(snapshot(change.fields.iter(), policy, |field| {
                field.current.as_ref()
            })),
            changed_fields: present_fields(&change.fields, |field| field.current.as_ref()),
        },
        ChangeOperation::Deleted => ChangePayload {
            old_values: Some(snapshot(change.fields.iter(), policy, |field| {
                field.original.as_ref()
            })),
            new_values: None,
            changed_fields: present_fields(&change.fields, |field| field.original.as_ref()),
        },
        ChangeOperation::Updated => {
            let modified = || change.fields.iter().filter(|field| field.is_modified);
            ChangePayload {
                old_values: Some(snapshot(modified(), policy, |field| field.original.as_ref())),
                new_values: Some(snapshot(modified(), policy, |field| field.current.as_ref())),
                changed_fields: modified().map(|field| field.name.clone()).collect(),
            }
        }
    };

    Ok(payload)
}

fn snapshot<'a>(
    fields: impl Iterator<Item = &'a TrackedField>,
    policy: &CapturePolicy,
    value_of: impl Fn(&'a TrackedField) -> Option<&'a Value>,
) -> Value {
    let object: Map<String, Value> = fields
        .map(|field| {
            let value = if policy.is_secret(field.name.as_str()) {
                Value::String(REDACTION_MARKER.to_owned())
            } else {
                value_of(field)
                    .map(|value| redact_nested(value, policy))
                    .unwrap_or(Value::Null)
            };
            (field.name.clone(), value)
        })
        .collect();

    Value::Object(object)
}

fn present_fields(
    fields: &[TrackedField],
    value_of: impl Fn(&TrackedField) -> Option<&Value>,
) -> Vec<String> {
    fields
        .iter()
        .filter(|field| value_of(field).is_some_and(|value| !value.is_null()))
        .map(|field| field.name.clone())
        .collect()
}

fn redact_nested(value: &Value, policy: &CapturePolicy) -> Value {
    match value {
        Value::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, nested)| {
                    let nested = if policy.is_secret(key.as_str()) {
                        Value::String(REDACTION_MARKER.to_owned())
                    } else {
                        redact_nested(nested, policy)
                    };
                    (key.clone(), nested)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| redact_nested(item, policy))
                .collect(),
        ),
        other => other.clone(),
    }
}
