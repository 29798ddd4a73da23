use axum::Router;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

pub(super) fn build_audit_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/audit/logs",
            get(handlers::audit::list_audit_logs_handler),
        )
        .route(
            "/api/audit/logs/{record_id}",
            get(handlers::audit::audit_log_detail_handler),
        )
        .route(
            "/api/audit/entities/{entity_type}/{entity_id}/history",
            get(handlers::audit::entity_history_handler),
        )
        .route(
            "/api/audit/statistics",
            get(handlers::audit::audit_statistics_handler),
        )
        .route(
            "/api/audit/export",
            get(handlers::audit::export_audit_logs_handler),
        )
        .route(
            "/api/audit/integrity/verify",
            post(handlers::audit::verify_integrity_handler),
        )
        .route(
            "/api/audit/alerts",
            get(handlers::findings::list_security_alerts_handler),
        )
        .route(
            "/api/audit/alerts/counts",
            get(handlers::findings::security_alert_counts_handler),
        )
        .route(
            "/api/audit/alerts/{alert_id}",
            get(handlers::findings::security_alert_detail_handler),
        )
        .route(
            "/api/audit/anomalies",
            get(handlers::findings::list_anomalies_handler),
        )
        .route(
            "/api/audit/anomalies/counts",
            get(handlers::findings::anomaly_counts_handler),
        )
        .route(
            "/api/audit/anomalies/{anomaly_id}",
            get(handlers::findings::anomaly_detail_handler),
        )
        .route(
            "/api/audit/dispatch/stats",
            get(handlers::dispatch::dispatch_stats_handler),
        )
}
