//! # Tiered Store
//!
//! A two-tier key-value cache with per-namespace expiry policies and
//! prefix invalidation.
//!
//! The store layers a session tier (in-process map, gone when the process
//! exits) over a durable tier (one JSON file per key, survives restarts).
//! Reads check the session tier first; a durable hit is promoted into the
//! session tier with its original write time so expiry stays honest.
//! Expired and undecodable entries are deleted the moment a read finds
//! them.
//!
//! Caching here is an optimisation, never a correctness requirement: the
//! [`TierManager`] surface cannot fail. Read faults become misses, write
//! faults are logged and swallowed, and when the durable directory cannot
//! be used at all the manager keeps working against memory alone.
//!
//! ## Features
//!
//! - **Layered reads**: session first, durable second, with promotion
//! - **Per-namespace expiry**: key-prefix rules with a default fallback
//! - **Delete on read**: expired and corrupt entries never linger
//! - **Prefix invalidation**: clear one namespace, leave the rest
//! - **Memory-only fallback**: degraded storage never breaks callers
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use tiered_store::{ExpiryPolicy, TierManager};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let policy = ExpiryPolicy::new(Duration::from_secs(24 * 60 * 60))
//!     .rule("gallery-", Duration::from_secs(7 * 24 * 60 * 60))
//!     .rule("search-", Duration::from_secs(30 * 60));
//!
//! let cache = TierManager::open("/var/cache/myapp", policy).await;
//!
//! cache.set_all("gallery-wildlife-artworks", &vec!["heron", "otter"]).await;
//! let hit: Option<Vec<String>> = cache.get("gallery-wildlife-artworks").await;
//! assert!(hit.is_some());
//!
//! // Drop every gallery entry, keep everything else.
//! cache.invalidate_prefix("gallery-").await;
//! # }
//! ```

pub mod durable;
pub mod entry;
pub mod error;
pub mod manager;
pub mod policy;
pub mod session;

pub use durable::DurableStore;
pub use entry::CacheEntry;
pub use error::{Result, StoreError};
pub use manager::{Tier, TierManager, TierStats};
pub use policy::{ExpiryPolicy, ExpiryRule};
pub use session::SessionStore;
