use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

mod audit;
mod internal;

pub fn build_router(app_state: AppState) -> Router {
    let protected_routes = Router::new()
        .merge(audit::build_audit_routes())
        .merge(internal::build_internal_routes())
        .route_layer(from_fn(middleware::require_actor));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(from_fn_with_state(
            app_state.clone(),
            middleware::scope_request_context,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
