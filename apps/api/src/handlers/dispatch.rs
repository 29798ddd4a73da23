use axum::Json;
use axum::extract::{Extension, State};

use auditrail_application::ProtectedOperation;
use auditrail_core::ActorIdentity;
use auditrail_domain::Capability;

use crate::dto::DispatchStatsResponse;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn dispatch_stats_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<DispatchStatsResponse>> {
    state
        .authorization_gate
        .authorize(
            &actor,
            &ProtectedOperation::new("audit.dispatch.stats", [Capability::AuditAdmin]),
        )
        .await?;

    Ok(Json(DispatchStatsResponse::from(state.dispatcher.stats())))
}
