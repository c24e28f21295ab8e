//! Aspect-ratio memory for grid layout.
//!
//! Knowing an image's aspect ratio before its bytes arrive lets the host
//! reserve correctly-sized cells and avoid layout shift. Ratios are held
//! in a bounded LRU keyed by source URL and written through to the
//! durable tier as one map, so a reload starts with every ratio the user
//! has already seen.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use tiered_store::{Tier, TierManager};

use crate::keys;

/// Entries kept in memory before the least recently used is dropped.
pub const DEFAULT_CAPACITY: usize = 2048;

/// Bounded aspect-ratio cache with durable write-through.
///
/// Cheap to clone; clones share the underlying map.
#[derive(Clone)]
pub struct AspectRatioCache {
    cache: TierManager,
    ratios: Arc<RwLock<LruCache<String, f64>>>,
}

impl AspectRatioCache {
    pub fn new(cache: TierManager) -> Self {
        Self::with_capacity(cache, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(cache: TierManager, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache,
            ratios: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    /// Load the persisted ratio map into memory. Call once at startup.
    pub async fn hydrate(&self) {
        let Some(saved) = self.cache.get::<HashMap<String, f64>>(keys::DIMENSIONS_KEY).await
        else {
            debug!("No persisted aspect ratios");
            return;
        };
        let mut ratios = self.ratios.write().await;
        let count = saved.len();
        for (url, ratio) in saved {
            ratios.put(url, ratio);
        }
        debug!(count, "Hydrated aspect ratios");
    }

    /// Ratio for a source URL, if already measured. Touches LRU order.
    pub async fn lookup(&self, url: &str) -> Option<f64> {
        self.ratios.write().await.get(url).copied()
    }

    /// Record a measured ratio and persist the full map.
    ///
    /// Non-finite and non-positive ratios are measurement glitches and
    /// are dropped.
    pub async fn store<U: Into<String>>(&self, url: U, ratio: f64) {
        if !ratio.is_finite() || ratio <= 0.0 {
            warn!(ratio, "Ignoring unusable aspect ratio");
            return;
        }

        let snapshot: HashMap<String, f64> = {
            let mut ratios = self.ratios.write().await;
            ratios.put(url.into(), ratio);
            ratios.iter().map(|(k, v)| (k.clone(), *v)).collect()
        };
        self.cache
            .set(Tier::Durable, keys::DIMENSIONS_KEY, &snapshot)
            .await;
    }

    pub async fn len(&self) -> usize {
        self.ratios.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ratios.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_manager() -> TierManager {
        TierManager::memory_only(tiered_store::ExpiryPolicy::default())
    }

    #[tokio::test]
    async fn stores_and_looks_up_ratios() {
        let ratios = AspectRatioCache::new(memory_manager());
        ratios.store("https://img.example.net/a.jpg", 1.5).await;
        ratios.store("https://img.example.net/b.jpg", 0.6667).await;

        assert_eq!(ratios.lookup("https://img.example.net/a.jpg").await, Some(1.5));
        assert_eq!(ratios.lookup("https://img.example.net/missing.jpg").await, None);
        assert_eq!(ratios.len().await, 2);
    }

    #[tokio::test]
    async fn rejects_unusable_ratios() {
        let ratios = AspectRatioCache::new(memory_manager());
        ratios.store("a", f64::NAN).await;
        ratios.store("b", f64::INFINITY).await;
        ratios.store("c", 0.0).await;
        ratios.store("d", -1.2).await;
        assert!(ratios.is_empty().await);
    }

    #[tokio::test]
    async fn hydrates_from_persisted_map() {
        let manager = memory_manager();
        let first = AspectRatioCache::new(manager.clone());
        first.store("https://img.example.net/a.jpg", 1.25).await;

        // A second instance over the same store sees the persisted map.
        let second = AspectRatioCache::new(manager);
        assert_eq!(second.lookup("https://img.example.net/a.jpg").await, None);
        second.hydrate().await;
        assert_eq!(second.lookup("https://img.example.net/a.jpg").await, Some(1.25));
    }

    #[tokio::test]
    async fn capacity_bounds_the_map() {
        let ratios = AspectRatioCache::with_capacity(memory_manager(), 2);
        ratios.store("a", 1.0).await;
        ratios.store("b", 2.0).await;
        ratios.store("c", 3.0).await;

        assert_eq!(ratios.len().await, 2);
        // "a" was least recently used.
        assert_eq!(ratios.lookup("a").await, None);
        assert_eq!(ratios.lookup("c").await, Some(3.0));
    }
}
