use super::*;

pub async fn list_audit_logs_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(query): Query<AuditLogQueryParams>,
) -> ApiResult<Json<AuditLogPageResponse>> {
    let AuditLogRequest {
        filter,
        page,
        page_size,
    } = query.into_request()?;

    let page = state
        .audit_log_service
        .query(&actor, filter, page, page_size)
        .await?;

    Ok(Json(AuditLogPageResponse::from(page)))
}

pub async fn audit_log_detail_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(record_id): Path<Uuid>,
) -> ApiResult<Json<AuditRecordDetailResponse>> {
    let detail = state
        .audit_log_service
        .find_record(&actor, record_id)
        .await?;

    Ok(Json(AuditRecordDetailResponse::from(detail)))
}

pub async fn entity_history_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Query(query): Query<EntityHistoryParams>,
) -> ApiResult<Json<AuditLogPageResponse>> {
    let page = state
        .audit_log_service
        .entity_history(
            &actor,
            entity_type.as_str(),
            entity_id.as_str(),
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(50),
        )
        .await?;

    Ok(Json(AuditLogPageResponse::from(page)))
}
