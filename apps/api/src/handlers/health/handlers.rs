use super::checks::{check_dispatch, check_postgres};
use super::*;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let postgres = check_postgres(state.statement_executor.clone()).await;
    let audit_dispatch = check_dispatch(&state.dispatcher);

    let ready = is_healthy(postgres.status) && audit_dispatch.status != "error";
    let status = if ready { "ok" } else { "degraded" };
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            ready,
            postgres,
            audit_dispatch,
            schema_isolation_policy: state.isolation_validator.policy().as_str(),
            schema_isolation_violations: state.isolation_validator.violations_detected(),
        }),
    )
}

fn is_healthy(status: &str) -> bool {
    status == "ok"
}
