use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use auditrail_core::{AppError, AppResult, TenantId};
use auditrail_domain::TenantDescriptor;
use tokio::sync::Mutex;

use crate::tenant_ports::TenantRegistry;

use super::{DEFAULT_TENANT_CACHE_MAX_AGE, TenantResolutionCache};

struct FakeTenantRegistry {
    tenants: Mutex<Vec<TenantDescriptor>>,
    loads: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl FakeTenantRegistry {
    fn with(tenants: Vec<TenantDescriptor>) -> Self {
        Self {
            tenants: Mutex::new(tenants),
            loads: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    async fn replace(&self, tenant: TenantDescriptor) {
        let mut tenants = self.tenants.lock().await;
        tenants.retain(|existing| existing.id() != tenant.id());
        tenants.push(tenant);
    }
}

#[async_trait]
impl TenantRegistry for FakeTenantRegistry {
    async fn load_by_subdomain(&self, subdomain: &str) -> AppResult<Option<TenantDescriptor>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(AppError::Internal("registry unavailable".to_owned()));
        }
        Ok(self
            .tenants
            .lock()
            .await
            .iter()
            .find(|tenant| tenant.subdomain() == subdomain)
            .cloned())
    }

    async fn load_by_id(&self, tenant_id: TenantId) -> AppResult<Option<TenantDescriptor>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(AppError::Internal("registry unavailable".to_owned()));
        }
        Ok(self
            .tenants
            .lock()
            .await
            .iter()
            .find(|tenant| tenant.id() == tenant_id)
            .cloned())
    }
}

fn tenant(id: TenantId, subdomain: &str, active: bool) -> TenantDescriptor {
    TenantDescriptor::new(id, subdomain, format!("tenant_{subdomain}"), subdomain, active)
        .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn hits_populate_both_keys() {
    let id = TenantId::new();
    let registry = Arc::new(FakeTenantRegistry::with(vec![tenant(id, "acme", true)]));
    let cache = TenantResolutionCache::new(registry.clone(), DEFAULT_TENANT_CACHE_MAX_AGE);

    let by_subdomain = cache.resolve_by_subdomain(" ACME ").await;
    assert!(matches!(by_subdomain, Ok(Some(ref value)) if value.id() == id));
    let by_id = cache.resolve_by_id(id).await;
    assert!(matches!(by_id, Ok(Some(ref value)) if value.subdomain() == "acme"));

    assert_eq!(registry.loads.load(Ordering::SeqCst), 1);
    assert_eq!(cache.cached_tenants(), 1);
}

#[tokio::test]
async fn concurrent_misses_share_one_registry_load() {
    let id = TenantId::new();
    let registry = Arc::new(FakeTenantRegistry {
        delay: Duration::from_millis(50),
        ..FakeTenantRegistry::with(vec![tenant(id, "globex", true)])
    });
    let cache = Arc::new(TenantResolutionCache::new(
        registry.clone(),
        DEFAULT_TENANT_CACHE_MAX_AGE,
    ));

    let mut lookups = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        lookups.push(tokio::spawn(async move {
            cache.resolve_by_subdomain("globex").await
        }));
    }
    for lookup in lookups {
        let resolved = lookup.await;
        assert!(matches!(resolved, Ok(Ok(Some(_)))));
    }

    assert_eq!(registry.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalidation_forces_a_fresh_load_and_suspension_applies_immediately() {
    let id = TenantId::new();
    let registry = Arc::new(FakeTenantRegistry::with(vec![tenant(id, "initech", true)]));
    let cache = TenantResolutionCache::new(registry.clone(), DEFAULT_TENANT_CACHE_MAX_AGE);

    assert!(cache.require_active_by_subdomain("initech").await.is_ok());

    registry.replace(tenant(id, "initech", false)).await;
    assert!(cache.require_active_by_subdomain("initech").await.is_ok());

    cache.invalidate_by_subdomain("Initech");
    let result = cache.require_active_by_subdomain("initech").await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert_eq!(registry.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalidate_by_id_drops_the_subdomain_entry_too() {
    let id = TenantId::new();
    let registry = Arc::new(FakeTenantRegistry::with(vec![tenant(id, "umbrella", true)]));
    let cache = TenantResolutionCache::new(registry.clone(), DEFAULT_TENANT_CACHE_MAX_AGE);

    assert!(cache.resolve_by_subdomain("umbrella").await.is_ok());
    cache.invalidate_by_id(id);
    assert_eq!(cache.cached_tenants(), 0);

    assert!(cache.resolve_by_subdomain("umbrella").await.is_ok());
    assert_eq!(registry.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn not_found_is_not_cached() {
    let registry = Arc::new(FakeTenantRegistry::with(Vec::new()));
    let cache = TenantResolutionCache::new(registry.clone(), DEFAULT_TENANT_CACHE_MAX_AGE);

    assert!(matches!(cache.resolve_by_subdomain("nobody").await, Ok(None)));
    assert!(matches!(
        cache.require_active_by_subdomain("nobody").await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(registry.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn registry_errors_propagate() {
    let registry = Arc::new(FakeTenantRegistry {
        fail: true,
        ..FakeTenantRegistry::with(Vec::new())
    });
    let cache = TenantResolutionCache::new(registry, DEFAULT_TENANT_CACHE_MAX_AGE);

    assert!(matches!(
        cache.resolve_by_id(TenantId::new()).await,
        Err(AppError::Internal(_))
    ));
}

#[tokio::test]
async fn expired_entries_are_reloaded() {
    let id = TenantId::new();
    let registry = Arc::new(FakeTenantRegistry::with(vec![tenant(id, "hooli", true)]));
    let cache = TenantResolutionCache::new(registry.clone(), Duration::ZERO);

    assert!(cache.resolve_by_id(id).await.is_ok());
    assert!(cache.resolve_by_id(id).await.is_ok());
    assert_eq!(registry.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn clear_all_empties_the_cache() {
    let registry = Arc::new(FakeTenantRegistry::with(vec![
        tenant(TenantId::new(), "a1", true),
        tenant(TenantId::new(), "b2", true),
    ]));
    let cache = TenantResolutionCache::new(registry, DEFAULT_TENANT_CACHE_MAX_AGE);

    assert!(cache.resolve_by_subdomain("a1").await.is_ok());
    assert!(cache.resolve_by_subdomain("b2").await.is_ok());
    assert_eq!(cache.cached_tenants(), 2);

    cache.clear_all();
    assert_eq!(cache.cached_tenants(), 0);
}
