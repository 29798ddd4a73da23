use axum::Json;
use axum::extract::{Extension, Path, State};

use auditrail_application::ProtectedOperation;
use auditrail_core::{ActorIdentity, AppResult, TenantId};
use auditrail_domain::Capability;
use tracing::info;
use uuid::Uuid;

use crate::dto::TenantCacheResponse;
use crate::error::ApiResult;
use crate::state::AppState;

async fn authorize_cache_hook(state: &AppState, actor: &ActorIdentity) -> AppResult<()> {
    state
        .authorization_gate
        .authorize(
            actor,
            &ProtectedOperation::new("tenants.cache.invalidate", [Capability::TenantsManage]),
        )
        .await
}

pub async fn invalidate_tenant_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(tenant_id): Path<Uuid>,
) -> ApiResult<Json<TenantCacheResponse>> {
    authorize_cache_hook(&state, &actor).await?;
    state
        .tenant_cache
        .invalidate_by_id(TenantId::from_uuid(tenant_id));
    info!(%tenant_id, actor_id = %actor.user_id(), "tenant cache entry invalidated");

    Ok(Json(TenantCacheResponse {
        cached_tenants: state.tenant_cache.cached_tenants(),
    }))
}

pub async fn invalidate_subdomain_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
    Path(subdomain): Path<String>,
) -> ApiResult<Json<TenantCacheResponse>> {
    authorize_cache_hook(&state, &actor).await?;
    state.tenant_cache.invalidate_by_subdomain(subdomain.as_str());
    info!(%subdomain, actor_id = %actor.user_id(), "tenant cache entry invalidated");

    Ok(Json(TenantCacheResponse {
        cached_tenants: state.tenant_cache.cached_tenants(),
    }))
}

pub async fn clear_tenant_cache_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorIdentity>,
) -> ApiResult<Json<TenantCacheResponse>> {
    authorize_cache_hook(&state, &actor).await?;
    state.tenant_cache.clear_all();
    info!(actor_id = %actor.user_id(), "tenant cache cleared");

    Ok(Json(TenantCacheResponse {
        cached_tenants: state.tenant_cache.cached_tenants(),
    }))
}
