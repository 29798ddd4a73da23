use axum::Router;
use axum::routing::{delete, post};

use crate::handlers;
use crate::state::AppState;

pub(super) fn build_internal_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/internal/audit/changes",
            post(handlers::capture::capture_changes_handler),
        )
        .route(
            "/internal/tenants/{tenant_id}/cache/invalidate",
            post(handlers::tenants::invalidate_tenant_handler),
        )
        .route(
            "/internal/tenants/subdomains/{subdomain}/cache/invalidate",
            post(handlers::tenants::invalidate_subdomain_handler),
        )
        .route(
            "/internal/tenants/cache",
            delete(handlers::tenants::clear_tenant_cache_handler),
        )
}
