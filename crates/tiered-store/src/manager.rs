//! Layered cache manager over the session and durable tiers.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::durable::DurableStore;
use crate::entry::CacheEntry;
use crate::policy::ExpiryPolicy;
use crate::session::SessionStore;

/// Which tier a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// In-process map, gone when the session ends.
    Session,
    /// File-backed store, survives restarts.
    Durable,
}

/// Entry counts per tier, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierStats {
    pub session_entries: usize,
    pub durable_entries: usize,
}

/// Cheap-to-clone handle over both cache tiers.
///
/// Reads are layered: session tier first, then durable, and a durable hit
/// is promoted into the session tier with its original write time. Expired
/// and undecodable entries are deleted on read. Faults never surface from
/// `get`/`set`: a failed read is a miss and a failed write is logged and
/// swallowed, so callers can treat caching purely as an optimisation.
///
/// When no durable tier is configured (or it failed to initialise) every
/// operation falls back to the session tier alone.
#[derive(Debug, Clone)]
pub struct TierManager {
    session: SessionStore,
    durable: Option<DurableStore>,
    policy: ExpiryPolicy,
}

impl TierManager {
    /// Manager with a durable tier under `base_dir`. Falls back to
    /// memory-only operation when the directory cannot be prepared.
    pub async fn open<P: AsRef<Path>>(base_dir: P, policy: ExpiryPolicy) -> Self {
        match DurableStore::open(base_dir).await {
            Ok(durable) => {
                debug!("Durable cache tier ready at {}", durable.base_dir().display());
                Self {
                    session: SessionStore::new(),
                    durable: Some(durable),
                    policy,
                }
            }
            Err(e) => {
                warn!("Durable cache tier unavailable, continuing memory-only: {e}");
                Self::memory_only(policy)
            }
        }
    }

    /// Manager backed by the session tier alone.
    pub fn memory_only(policy: ExpiryPolicy) -> Self {
        Self {
            session: SessionStore::new(),
            durable: None,
            policy,
        }
    }

    /// Layered read.
    ///
    /// Expired entries are evicted from the tier they were found in; an
    /// expired session copy still falls through to the durable tier, which
    /// may hold a newer write.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = Utc::now();

        if let Some(entry) = self.session.get(key).await {
            if self.policy.is_fresh(key, entry.stored_at, now) {
                match serde_json::from_value(entry.payload) {
                    Ok(value) => {
                        debug!("Cache hit (session) for '{key}'");
                        return Some(value);
                    }
                    Err(e) => {
                        warn!("Dropping undecodable session entry '{key}': {e}");
                        self.remove(key).await;
                        return None;
                    }
                }
            }
            debug!("Session entry '{key}' expired, evicting");
            self.session.remove(key).await;
        }

        let durable = self.durable.as_ref()?;
        match durable.get(key).await {
            Ok(Some(entry)) => {
                if !self.policy.is_fresh(key, entry.stored_at, now) {
                    debug!("Durable entry '{key}' expired, evicting");
                    self.remove(key).await;
                    return None;
                }
                match serde_json::from_value::<T>(entry.payload.clone()) {
                    Ok(value) => {
                        debug!("Cache hit (durable) for '{key}', promoting to session tier");
                        self.session.insert(key, entry).await;
                        Some(value)
                    }
                    Err(e) => {
                        warn!("Dropping undecodable durable entry '{key}': {e}");
                        self.remove(key).await;
                        None
                    }
                }
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Durable read failed for '{key}', treating as miss: {e}");
                self.remove(key).await;
                None
            }
        }
    }

    /// Write `value` to one tier, stamped with the current time.
    pub async fn set<T: Serialize>(&self, tier: Tier, key: &str, value: &T) {
        let Some(payload) = self.serialize_payload(key, value) else {
            return;
        };
        self.set_entry(tier, key, CacheEntry::new(payload)).await;
    }

    /// Write the same value to both tiers.
    pub async fn set_all<T: Serialize>(&self, key: &str, value: &T) {
        let Some(payload) = self.serialize_payload(key, value) else {
            return;
        };
        let entry = CacheEntry::new(payload);
        self.set_entry(Tier::Session, key, entry.clone()).await;
        self.set_entry(Tier::Durable, key, entry).await;
    }

    /// Insert a pre-built envelope. Lets callers that replay or migrate
    /// entries control `stored_at`.
    pub async fn set_entry(&self, tier: Tier, key: &str, entry: CacheEntry) {
        match tier {
            Tier::Session => self.session.insert(key, entry).await,
            Tier::Durable => {
                let Some(durable) = self.durable.as_ref() else {
                    debug!("No durable tier, keeping '{key}' in the session tier");
                    self.session.insert(key, entry).await;
                    return;
                };
                if let Err(e) = durable.insert(key, &entry).await {
                    warn!("Durable write failed for '{key}', entry stays session-only: {e}");
                    self.session.insert(key, entry).await;
                }
            }
        }
    }

    /// Delete `key` from every tier.
    pub async fn remove(&self, key: &str) {
        self.session.remove(key).await;
        if let Some(durable) = self.durable.as_ref() {
            if let Err(e) = durable.remove(key).await {
                warn!("Durable delete failed for '{key}': {e}");
            }
        }
    }

    /// Remove every key under `prefix` from all tiers.
    pub async fn invalidate_prefix(&self, prefix: &str) {
        let from_session = self.session.remove_prefix(prefix).await;
        let mut from_durable = 0;
        if let Some(durable) = self.durable.as_ref() {
            match durable.remove_prefix(prefix).await {
                Ok(removed) => from_durable = removed,
                Err(e) => warn!("Durable prefix invalidation failed for '{prefix}': {e}"),
            }
        }
        debug!(
            "Invalidated prefix '{prefix}': {from_session} session, {from_durable} durable entries"
        );
    }

    /// Whether a durable tier is active.
    pub fn has_durable_tier(&self) -> bool {
        self.durable.is_some()
    }

    /// The policy this manager evaluates entries against.
    pub fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    /// Entry counts per tier.
    pub async fn stats(&self) -> TierStats {
        let session_entries = self.session.len().await;
        let durable_entries = match self.durable.as_ref() {
            Some(durable) => durable.keys().await.map(|keys| keys.len()).unwrap_or(0),
            None => 0,
        };
        TierStats {
            session_entries,
            durable_entries,
        }
    }

    fn serialize_payload<T: Serialize>(&self, key: &str, value: &T) -> Option<serde_json::Value> {
        match serde_json::to_value(value) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("Refusing to cache unserializable value for '{key}': {e}");
                None
            }
        }
    }
}
