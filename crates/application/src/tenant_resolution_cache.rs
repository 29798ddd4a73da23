use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use auditrail_core::{AppError, AppResult, TenantId};
use auditrail_domain::{TenantDescriptor, normalize_subdomain};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::tenant_ports::TenantRegistry;

#[cfg(test)]
mod tests;

/// Default absolute age after which a cached entry is reloaded.
pub const DEFAULT_TENANT_CACHE_MAX_AGE: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LoadKey {
    Subdomain(String),
    Id(TenantId),
}

type PendingLoad = Arc<OnceCell<Option<Arc<TenantDescriptor>>>>;

#[derive(Debug, Clone)]
struct CachedTenant {
    descriptor: Arc<TenantDescriptor>,
    cached_at: Instant,
}

/// Read-through tenant cache keyed by both subdomain and id.
///
/// Reads are lock-free. Concurrent misses on one key share a single registry load.
/// Both keyed entries are written and invalidated together under a writer-only
/// mutex, and a generation counter discards loads that raced an invalidation.
/// Not-found results are never cached.
pub struct TenantResolutionCache {
    registry: Arc<dyn TenantRegistry>,
    by_subdomain: DashMap<String, CachedTenant>,
    by_id: DashMap<TenantId, CachedTenant>,
    pending: DashMap<LoadKey, PendingLoad>,
    writer: Mutex<()>,
    generation: AtomicU64,
    max_age: Duration,
}

impl TenantResolutionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(registry: Arc<dyn TenantRegistry>, max_age: Duration) -> Self {
        Self {
            registry,
            by_subdomain: DashMap::new(),
            by_id: DashMap::new(),
            pending: DashMap::new(),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
            max_age,
        }
    }

    /// Resolves a tenant by subdomain. Registry errors propagate.
    pub async fn resolve_by_subdomain(
        &self,
        subdomain: &str,
    ) -> AppResult<Option<Arc<TenantDescriptor>>> {
        let subdomain = normalize_subdomain(subdomain);
        if subdomain.is_empty() {
            return Ok(None);
        }

        if let Some(descriptor) = self.fresh(self.by_subdomain.get(&subdomain).as_deref()) {
            return Ok(Some(descriptor));
        }

        self.load(LoadKey::Subdomain(subdomain)).await
    }

    /// Resolves a tenant by id. Registry errors propagate.
    pub async fn resolve_by_id(&self, tenant_id: TenantId) -> AppResult<Option<Arc<TenantDescriptor>>> {
        if let Some(descriptor) = self.fresh(self.by_id.get(&tenant_id).as_deref()) {
            return Ok(Some(descriptor));
        }

        self.load(LoadKey::Id(tenant_id)).await
    }

    /// Resolves an active tenant by subdomain.
    ///
    /// Unknown subdomains are `NotFound`; suspended tenants are `Forbidden`.
    pub async fn require_active_by_subdomain(
        &self,
        subdomain: &str,
    ) -> AppResult<Arc<TenantDescriptor>> {
        let descriptor = self
            .resolve_by_subdomain(subdomain)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("tenant '{subdomain}' does not exist")))?;

        if !descriptor.is_active() {
            return Err(AppError::Forbidden(format!(
                "tenant '{}' is suspended",
                descriptor.subdomain()
            )));
        }

        Ok(descriptor)
    }

    /// Drops the entries for a subdomain and for the tenant it resolved to.
    pub fn invalidate_by_subdomain(&self, subdomain: &str) {
        let subdomain = normalize_subdomain(subdomain);
        let _writer = self.writer.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.pending.remove(&LoadKey::Subdomain(subdomain.clone()));
        if let Some((_, cached)) = self.by_subdomain.remove(&subdomain) {
            let tenant_id = cached.descriptor.id();
            self.by_id.remove(&tenant_id);
            self.pending.remove(&LoadKey::Id(tenant_id));
        }
        info!(subdomain = %subdomain, "tenant cache entry invalidated");
    }

    /// Drops the entries for a tenant id and for its subdomain.
    pub fn invalidate_by_id(&self, tenant_id: TenantId) {
        let _writer = self.writer.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.pending.remove(&LoadKey::Id(tenant_id));
        if let Some((_, cached)) = self.by_id.remove(&tenant_id) {
            let subdomain = cached.descriptor.subdomain().to_owned();
            self.by_subdomain.remove(&subdomain);
            self.pending.remove(&LoadKey::Subdomain(subdomain));
        }
        info!(tenant_id = %tenant_id, "tenant cache entry invalidated");
    }

    /// Drops every entry.
    pub fn clear_all(&self) {
        let _writer = self.writer.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.pending.clear();
        self.by_subdomain.clear();
        self.by_id.clear();
        info!("tenant cache cleared");
    }

    /// Returns the number of cached tenants.
    #[must_use]
    pub fn cached_tenants(&self) -> usize {
        self.by_id.len()
    }

    fn fresh(&self, cached: Option<&CachedTenant>) -> Option<Arc<TenantDescriptor>> {
        cached
            .filter(|cached| cached.cached_at.elapsed() < self.max_age)
            .map(|cached| Arc::clone(&cached.descriptor))
    }

    async fn load(&self, key: LoadKey) -> AppResult<Option<Arc<TenantDescriptor>>> {
        let cell = Arc::clone(
            self.pending
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        let loaded = cell
            .get_or_try_init(|| async {
                let generation = self.generation.load(Ordering::Acquire);
                debug!(key = ?key, "tenant cache miss; loading from registry");
                let descriptor = match &key {
                    LoadKey::Subdomain(subdomain) => {
                        self.registry.load_by_subdomain(subdomain).await?
                    }
                    LoadKey::Id(tenant_id) => self.registry.load_by_id(*tenant_id).await?,
                }
                .map(Arc::new);

                if let Some(descriptor) = descriptor.as_ref() {
                    self.populate(descriptor, generation);
                }
                Ok::<_, AppError>(descriptor)
            })
            .await
            .cloned();

        self.pending
            .remove_if(&key, |_, pending| Arc::ptr_eq(pending, &cell));

        loaded
    }

    fn populate(&self, descriptor: &Arc<TenantDescriptor>, generation: u64) {
        let _writer = self.writer.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(tenant_id = %descriptor.id(), "discarding tenant load that raced an invalidation");
            return;
        }

        let cached = CachedTenant {
            descriptor: Arc::clone(descriptor),
            cached_at: Instant::now(),
        };
        if let Some(previous) = self.by_id.insert(descriptor.id(), cached.clone())
            && previous.descriptor.subdomain() != descriptor.subdomain()
        {
            self.by_subdomain.remove(previous.descriptor.subdomain());
        }
        if let Some(previous) = self
            .by_subdomain
            .insert(descriptor.subdomain().to_owned(), cached)
            && previous.descriptor.id() != descriptor.id()
        {
            self.by_id.remove(&previous.descriptor.id());
        }
    }
}
