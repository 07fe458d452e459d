/// Read cache over maintenance-request listings.
///
/// Entries are keyed by [`RequestFilter::cache_key`] within a generation.
/// Eviction is namespace-wide: after any write every entry is dropped,
/// related or not, and the generation moves on so a read that started before
/// the write can never publish its result to later readers.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::future::Cache;
use tracing::trace;

use crate::error::AppError;
use crate::maintenance::{MaintenanceRequest, RequestFilter};

pub type Listing = Arc<Vec<MaintenanceRequest>>;

type Key = (u64, String);

#[derive(Clone)]
pub struct ListingCache {
    entries: Cache<Key, Listing>,
    generation: Arc<AtomicU64>,
}

impl ListingCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_entries).build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn key(&self, filter: &RequestFilter) -> Key {
        (self.generation.load(Ordering::Acquire), filter.cache_key())
    }

    /// Cached listing for `filter`, computing and storing it on a miss.
    ///
    /// Concurrent misses on the same key share one computation. A failed
    /// computation leaves the cache untouched, and a result computed across
    /// an [`evict_all`](Self::evict_all) is returned to its caller but not
    /// kept.
    pub async fn get_or_compute<F, Fut>(&self, filter: &RequestFilter, compute: F) -> Result<Listing, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<MaintenanceRequest>, AppError>>,
    {
        let key = self.key(filter);
        let (generation, label) = key.clone();
        let result = self
            .entries
            .try_get_with(key.clone(), async move {
                trace!(key = %label, generation, "listing cache miss");
                compute().await.map(Arc::new)
            })
            .await;

        if self.generation.load(Ordering::Acquire) != key.0 {
            self.entries.invalidate(&key).await;
        }

        result.map_err(|shared| {
            Arc::try_unwrap(shared).unwrap_or_else(|shared| AppError::Internal(shared.to_string()))
        })
    }

    /// Drop every entry in the namespace.
    pub fn evict_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.invalidate_all();
        trace!("listing cache cleared");
    }

    pub async fn contains(&self, filter: &RequestFilter) -> bool {
        self.entries.get(&self.key(filter)).await.is_some()
    }
}
