use axum::Json;
use axum::extract::{Extension, State};

use auditrail_core::{ActorIdentity, AppResult};
use auditrail_domain::TrackedChange;

use crate::dto::{CaptureChangesRequest, CaptureChangesResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Captures committed entity changes reported by an upstream service.
pub async fn capture_changes_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Json(payload): Json<CaptureChangesRequest>,
) -> ApiResult<Json<CaptureChangesResponse>> {
    let changes = payload
        .changes
        .into_iter()
        .map(TrackedChange::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    let captured = state
        .change_ingestion_service
        .ingest(&actor, changes)
        .await?;
    Ok(Json(CaptureChangesResponse { captured }))
}
