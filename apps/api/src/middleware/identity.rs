use auditrail_core::{ActorIdentity, AppError, TenantId, UserId};
use axum::http::HeaderMap;
use uuid::Uuid;

pub(super) const ACTOR_ID_HEADER: &str = "x-actor-id";
pub(super) const ACTOR_EMAIL_HEADER: &str = "x-actor-email";
pub(super) const ACTOR_ROLE_HEADER: &str = "x-actor-role";

pub(super) fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

/// Reads the gateway-supplied identity. Requests without `X-Actor-Id` are anonymous.
pub(super) fn actor_from_headers(
    headers: &HeaderMap,
    tenant_id: Option<TenantId>,
) -> Result<Option<ActorIdentity>, AppError> {
    let Some(raw_id) = header_value(headers, ACTOR_ID_HEADER) else {
        return Ok(None);
    };

    let user_id = Uuid::parse_str(raw_id.as_str())
        .map(UserId::from_uuid)
        .map_err(|error| AppError::Unauthorized(format!("invalid X-Actor-Id header: {error}")))?;

    Ok(Some(ActorIdentity::new(
        user_id,
        header_value(headers, ACTOR_EMAIL_HEADER),
        header_value(headers, ACTOR_ROLE_HEADER),
        tenant_id,
    )))
}
