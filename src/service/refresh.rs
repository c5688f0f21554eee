use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use super::ServiceMap;
use crate::cache::CACHE_LOCK_KEY;
use crate::error::{RefreshError, ServiceError, StoreError};
use crate::store::Store;
use crate::types::TeamId;

/// "Refresh in progress" flag, observable by any holder of the lock.
///
/// When built with a store, the state is mirrored under `cache.lock` so
/// another process can poll it.
pub struct CacheLock {
    locked: AtomicBool,
    store: Option<Arc<dyn Store>>,
}

impl CacheLock {
    pub fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            store: None,
        }
    }

    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self {
            locked: AtomicBool::new(false),
            store: Some(store),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Read the mirrored flag written by any process sharing `store`
    pub fn is_persisted_locked(store: &dyn Store) -> Result<bool, StoreError> {
        Ok(store.read(CACHE_LOCK_KEY)?.is_some())
    }

    /// Take the lock; fails if a refresh is already running
    pub fn acquire(&self) -> Result<CacheLockGuard<'_>, RefreshError> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RefreshError::InProgress);
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.write(CACHE_LOCK_KEY, &serde_json::json!(1)) {
                self.locked.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        }

        Ok(CacheLockGuard { lock: self })
    }

    fn release(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.delete(CACHE_LOCK_KEY) {
                warn!("Failed to clear persisted cache lock: {}", e);
            }
        }
        self.locked.store(false, Ordering::SeqCst);
    }
}

impl Default for CacheLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the cache lock when dropped, including on error or cancellation
pub struct CacheLockGuard<'a> {
    lock: &'a CacheLock,
}

impl Drop for CacheLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// Outcome of a full refresh
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub refreshed: Vec<TeamId>,
    pub failed: Vec<(TeamId, ServiceError)>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Refreshes every team's cache under the global lock
pub struct CacheRefresher {
    lock: Arc<CacheLock>,
}

impl CacheRefresher {
    pub fn new(lock: Arc<CacheLock>) -> Self {
        Self { lock }
    }

    pub fn lock(&self) -> &Arc<CacheLock> {
        &self.lock
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Refresh all teams concurrently. The lock is held for the whole run and
    /// released even if a team fails.
    pub async fn refresh_all(&self, services: &ServiceMap) -> Result<RefreshReport, RefreshError> {
        let _guard = self.lock.acquire()?;
        let services = services.snapshot();
        info!("Refreshing cache for {} team(s)", services.len());

        let results = join_all(services.into_iter().map(|(team_id, service)| async move {
            let result = service.refresh_cache().await;
            (team_id, result)
        }))
        .await;

        let mut report = RefreshReport::default();
        for (team_id, result) in results {
            match result {
                Ok(()) => report.refreshed.push(team_id),
                Err(e) => {
                    warn!("Cache refresh failed for team {}: {}", team_id, e);
                    report.failed.push((team_id, e));
                }
            }
        }

        Ok(report)
    }
}
