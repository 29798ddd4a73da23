use super::*;

const DEFAULT_INTEGRITY_LOOKBACK_DAYS: u32 = 30;
const MAX_INTEGRITY_LOOKBACK_DAYS: u32 = 3_650;

pub async fn audit_statistics_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(query): Query<StatisticsQueryParams>,
) -> ApiResult<Json<AuditStatisticsResponse>> {
    let statistics = state
        .audit_log_service
        .statistics(&actor, query.into())
        .await?;

    Ok(Json(AuditStatisticsResponse::from(statistics)))
}

pub async fn export_audit_logs_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(query): Query<AuditLogQueryParams>,
    Query(export): Query<ExportParams>,
) -> ApiResult<Response> {
    let format = export
        .format
        .as_deref()
        .map(str::parse::<ExportFormat>)
        .transpose()?
        .unwrap_or_default();
    let AuditLogRequest { filter, .. } = query.into_request()?;

    let export = state
        .audit_log_service
        .export(&actor, filter, format)
        .await?;
    let filename = format!(
        "audit-export-{}.{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        export.format.as_str()
    );

    Ok((
        [
            (header::CONTENT_TYPE, export.format.content_type().to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        export.content,
    )
        .into_response())
}

pub async fn verify_integrity_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Query(query): Query<IntegrityVerifyParams>,
) -> ApiResult<Json<IntegrityReportResponse>> {
    let since_days = query.since_days.unwrap_or(DEFAULT_INTEGRITY_LOOKBACK_DAYS);
    if since_days == 0 || since_days > MAX_INTEGRITY_LOOKBACK_DAYS {
        return Err(AppError::Validation(format!(
            "since_days must be between 1 and {MAX_INTEGRITY_LOOKBACK_DAYS}"
        ))
        .into());
    }

    let since = Utc::now() - Duration::days(i64::from(since_days));
    let report = state
        .audit_log_service
        .verify_integrity(&actor, since)
        .await?;

    Ok(Json(IntegrityReportResponse::from(report)))
}
