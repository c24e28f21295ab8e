//! In-process session tier.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::entry::CacheEntry;

/// Session-scoped tier: a plain map that lives and dies with the process.
///
/// Cloning shares the underlying map, so one store can be handed to every
/// component of a browsing session.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `key`, if present. Freshness is the caller's concern.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn insert<K: Into<String>>(&self, key: K, entry: CacheEntry) {
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Remove one key. Returns whether it was present.
    pub async fn remove(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Remove every key starting with `prefix`, returning how many went.
    pub async fn remove_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
