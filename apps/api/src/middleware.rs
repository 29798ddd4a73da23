use std::net::SocketAddr;

use auditrail_application::RequestContext;
use auditrail_core::{ActorIdentity, AppError};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::request_context::TaskLocalRequestContext;
use crate::state::AppState;

mod client_ip;
mod identity;

use client_ip::resolve_client_ip;
use identity::{actor_from_headers, header_value};

const REQUEST_ID_HEADER: &str = "x-request-id";
const SESSION_ID_HEADER: &str = "x-session-id";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const TENANT_SUBDOMAIN_HEADER: &str = "x-tenant-subdomain";

/// Captures the request context and actor, then serves the request inside that scope.
pub async fn scope_request_context(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let headers = request.headers();
    let correlation_id = header_value(headers, REQUEST_ID_HEADER)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let tenant_id = match header_value(headers, TENANT_SUBDOMAIN_HEADER) {
        Some(subdomain) => Some(
            state
                .tenant_cache
                .require_active_by_subdomain(subdomain.as_str())
                .await?
                .id(),
        ),
        None => None,
    };

    let headers = request.headers();
    let actor = actor_from_headers(headers, tenant_id)?;
    let client_ip = resolve_client_ip(
        peer.ip(),
        headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|value| value.to_str().ok()),
        &state.trusted_proxies,
    );

    let context = RequestContext {
        ip_address: Some(client_ip.to_string()),
        user_agent: header_value(headers, header::USER_AGENT.as_str()),
        http_method: Some(request.method().to_string()),
        path: Some(request.uri().path().to_owned()),
        query_string: request.uri().query().map(ToOwned::to_owned),
        correlation_id: Some(correlation_id.clone()),
        session_id: header_value(headers, SESSION_ID_HEADER),
        actor: actor.clone(),
    };

    if let Some(actor) = actor {
        request.extensions_mut().insert(actor);
    }

    let mut response = TaskLocalRequestContext::scope(context, next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    Ok(response)
}

pub async fn require_actor(request: Request, next: Next) -> ApiResult<Response> {
    if request.extensions().get::<ActorIdentity>().is_none() {
        return Err(AppError::Unauthorized("authentication required".to_owned()).into());
    }

    Ok(next.run(request).await)
}
