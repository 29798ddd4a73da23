use axum::Json;
use axum::extract::{Extension, Path, Query, State};

use auditrail_core::ActorIdentity;
use uuid::Uuid;

use crate::dto::{
    AnomalyResponse, FindingPageResponse, FindingQueryParams, FindingRequest,
    SecurityAlertResponse, SeverityCountsResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_security_alerts_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(query): Query<FindingQueryParams>,
) -> ApiResult<Json<FindingPageResponse<SecurityAlertResponse>>> {
    let FindingRequest {
        filter,
        page,
        page_size,
    } = query.into_alert_request()?;

    let page = state
        .security_findings_service
        .list_alerts(&actor, filter, page, page_size)
        .await?;

    Ok(Json(FindingPageResponse::from(page)))
}

pub async fn security_alert_detail_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(alert_id): Path<Uuid>,
) -> ApiResult<Json<SecurityAlertResponse>> {
    let alert = state
        .security_findings_service
        .find_alert(&actor, alert_id)
        .await?;

    Ok(Json(SecurityAlertResponse::from(alert)))
}

pub async fn security_alert_counts_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(query): Query<FindingQueryParams>,
) -> ApiResult<Json<SeverityCountsResponse>> {
    let FindingRequest { filter, .. } = query.into_alert_request()?;

    let counts = state
        .security_findings_service
        .alert_severity_counts(&actor, filter)
        .await?;

    Ok(Json(SeverityCountsResponse::from(counts)))
}

pub async fn list_anomalies_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(query): Query<FindingQueryParams>,
) -> ApiResult<Json<FindingPageResponse<AnomalyResponse>>> {
    let FindingRequest {
        filter,
        page,
        page_size,
    } = query.into_anomaly_request()?;

    let page = state
        .security_findings_service
        .list_anomalies(&actor, filter, page, page_size)
        .await?;

    Ok(Json(FindingPageResponse::from(page)))
}

pub async fn anomaly_detail_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(anomaly_id): Path<Uuid>,
) -> ApiResult<Json<AnomalyResponse>> {
    let anomaly = state
        .security_findings_service
        .find_anomaly(&actor, anomaly_id)
        .await?;

    Ok(Json(AnomalyResponse::from(anomaly)))
}

pub async fn anomaly_counts_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(query): Query<FindingQueryParams>,
) -> ApiResult<Json<SeverityCountsResponse>> {
    let FindingRequest { filter, .. } = query.into_anomaly_request()?;

    let counts = state
        .security_findings_service
        .anomaly_severity_counts(&actor, filter)
        .await?;

    Ok(Json(SeverityCountsResponse::from(counts)))
}
