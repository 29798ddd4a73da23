use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use auditrail_application::{AuditStatistics, AuditStatisticsCache};
use auditrail_core::AppResult;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StatisticsCacheEntry {
    statistics: AuditStatistics,
    expires_at: Instant,
}

/// In-memory cache adapter for audit statistics.
#[derive(Default)]
pub struct InMemoryAuditStatisticsCache {
    entries: RwLock<HashMap<String, StatisticsCacheEntry>>,
}

impl InMemoryAuditStatisticsCache {
    /// Creates an empty statistics cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStatisticsCache for InMemoryAuditStatisticsCache {
    async fn get_statistics(&self, cache_key: &str) -> AppResult<Option<AuditStatistics>> {
        {
            let entries = self.entries.read().await;
            match entries.get(cache_key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.statistics.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(cache_key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(cache_key);
        }

        Ok(None)
    }

    async fn set_statistics(
        &self,
        cache_key: &str,
        statistics: &AuditStatistics,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
            .unwrap_or(now);

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            cache_key.to_owned(),
            StatisticsCacheEntry {
                statistics: statistics.clone(),
                expires_at,
            },
        );

        Ok(())
    }
}
