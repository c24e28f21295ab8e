//! Pagination and infinite-scroll coordination.
//!
//! [`GalleryService`] owns the accumulated artwork list and page cursor
//! for one browsing context. Loads append, never replace; every successful
//! page writes the full accumulated list to both cache tiers, so a
//! late-arriving write can only repeat newer-or-equal state. Grouped
//! records are immutable apart from their like count, which
//! [`GalleryService::apply_like`] patches in place.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use tiered_store::TierManager;

use crate::config::Config;
use crate::errors::FetchResult;
use crate::grouping;
use crate::keys;
use crate::models::{Artwork, DisplayEntry, PageState, RemotePage};
use crate::remote::ContentService;

/// Cache and paging profile for one browsing context.
///
/// The prefixes decide which expiry rules apply and what an
/// `invalidate_prefix` sweep clears; public and admin contexts stay in
/// disjoint namespaces.
#[derive(Debug, Clone)]
pub struct ContextProfile {
    /// Namespace for listing keys, e.g. `"gallery-"`.
    pub prefix: String,
    /// Namespace for search keys, e.g. `"search-"`.
    pub search_prefix: String,
    pub collection: String,
    pub page_size: u32,
    /// Sort search results by like count instead of catalogue order.
    pub sort_by_likes: bool,
}

impl ContextProfile {
    /// Profile for the public gallery.
    pub fn public<C: Into<String>>(config: &Config, collection: C) -> Self {
        Self {
            prefix: keys::GALLERY_PREFIX.to_string(),
            search_prefix: keys::SEARCH_PREFIX.to_string(),
            collection: collection.into(),
            page_size: config.remote.page_size,
            sort_by_likes: config.search.sort_by_likes,
        }
    }

    /// Profile for the admin console: short-lived caches, catalogue order.
    pub fn admin<C: Into<String>>(config: &Config, collection: C) -> Self {
        Self {
            prefix: keys::ADMIN_GALLERY_PREFIX.to_string(),
            search_prefix: keys::ADMIN_SEARCH_PREFIX.to_string(),
            collection: collection.into(),
            page_size: config.remote.page_size,
            sort_by_likes: false,
        }
    }
}

/// How `load_initial` satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialLoad {
    /// Restored from cache; the network was never touched.
    Restored,
    /// Fetched page 1 from the content service.
    Fetched,
}

/// Render state handed to the host.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub artworks: Vec<Artwork>,
    pub entries: Vec<DisplayEntry>,
    pub page: PageState,
    pub loading_more: bool,
}

#[derive(Debug)]
struct FeedState {
    artworks: Vec<Artwork>,
    entries: Vec<DisplayEntry>,
    page: PageState,
    /// In-flight guard: set before a fetch starts, cleared when it
    /// settles, success or failure.
    loading_more: bool,
    /// Supersession counter: responses carry the generation they started
    /// under and are dropped if it moved on.
    generation: u64,
}

impl FeedState {
    fn new() -> Self {
        Self {
            artworks: Vec::new(),
            entries: Vec::new(),
            page: PageState::initial(),
            loading_more: false,
            generation: 0,
        }
    }
}

/// Append-only pagination over one collection.
pub struct GalleryService {
    service: Arc<dyn ContentService>,
    cache: TierManager,
    profile: ContextProfile,
    state: Arc<RwLock<FeedState>>,
}

impl GalleryService {
    pub fn new(service: Arc<dyn ContentService>, cache: TierManager, profile: ContextProfile) -> Self {
        Self {
            service,
            cache,
            profile,
            state: Arc::new(RwLock::new(FeedState::new())),
        }
    }

    pub fn profile(&self) -> &ContextProfile {
        &self.profile
    }

    fn artworks_key(&self) -> String {
        keys::artworks_key(&self.profile.prefix, &self.profile.collection)
    }

    fn page_state_key(&self) -> String {
        keys::page_state_key(&self.profile.prefix, &self.profile.collection)
    }

    /// Load the first page, preferring the cache.
    ///
    /// A cache hit restores the artwork list and page cursor exactly as
    /// persisted, `has_more` included, and recomputes the display list;
    /// no network call is made. A miss fetches page 1, groups it and
    /// stores the result into both tiers.
    pub async fn load_initial(&self) -> FetchResult<InitialLoad> {
        let cached_artworks: Option<Vec<Artwork>> = self.cache.get(&self.artworks_key()).await;
        let cached_page: Option<PageState> = self.cache.get(&self.page_state_key()).await;

        if let (Some(artworks), Some(page)) = (cached_artworks, cached_page) {
            let entries = grouping::display_list(&artworks);
            let mut state = self.state.write().await;
            state.generation += 1;
            state.artworks = artworks;
            state.entries = entries;
            state.page = page;
            state.loading_more = false;
            info!(
                collection = %self.profile.collection,
                entries = state.entries.len(),
                page = state.page.current_page,
                has_more = state.page.has_more,
                "Restored gallery from cache"
            );
            return Ok(InitialLoad::Restored);
        }

        debug!(collection = %self.profile.collection, "Gallery cache miss, fetching first page");
        let started = Instant::now();
        let fetched = self
            .service
            .list_page(&self.profile.collection, 1, self.profile.page_size)
            .await?;
        let entry_count = self.apply_first_page(fetched).await;
        info!(
            collection = %self.profile.collection,
            entries = entry_count,
            elapsed = ?started.elapsed(),
            "Loaded first gallery page"
        );
        Ok(InitialLoad::Fetched)
    }

    async fn apply_first_page(&self, fetched: RemotePage) -> usize {
        let record_count = fetched.records.len();
        let has_more = fetched.has_more && record_count > 0;
        let artworks = grouping::group_page(fetched.records);
        let entries = grouping::display_list(&artworks);
        let entry_count = entries.len();
        let page = PageState {
            current_page: 1,
            has_more,
            total_seen: record_count,
        };

        {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.artworks = artworks.clone();
            state.entries = entries;
            state.page = page;
            state.loading_more = false;
        }

        self.cache.set_all(&self.artworks_key(), &artworks).await;
        self.cache.set_all(&self.page_state_key(), &page).await;
        entry_count
    }

    /// Fetch and append the next page.
    ///
    /// Returns `Ok(true)` when a page was appended and `Ok(false)` for the
    /// speculative no-ops: a load already in flight, nothing more to load,
    /// an empty page, or a response that arrived for superseded state. A
    /// failed fetch leaves the cursor and accumulated list untouched and
    /// returns the error so the host can offer a retry.
    pub async fn load_more(&self) -> FetchResult<bool> {
        let (next_page, generation) = {
            let mut state = self.state.write().await;
            if state.loading_more || !state.page.has_more {
                debug!(
                    loading = state.loading_more,
                    has_more = state.page.has_more,
                    "Ignoring speculative load_more"
                );
                return Ok(false);
            }
            state.loading_more = true;
            (state.page.current_page + 1, state.generation)
        };

        let fetched = match self
            .service
            .list_page(&self.profile.collection, next_page, self.profile.page_size)
            .await
        {
            Ok(fetched) => fetched,
            Err(e) => {
                let mut state = self.state.write().await;
                if state.generation == generation {
                    state.loading_more = false;
                }
                warn!(
                    collection = %self.profile.collection,
                    page = next_page,
                    "Failed to load gallery page: {e}"
                );
                return Err(e);
            }
        };

        let (artworks_snapshot, page_snapshot, entry_count) = {
            let mut state = self.state.write().await;
            if state.generation != generation {
                debug!(page = next_page, "Dropping gallery page for superseded state");
                return Ok(false);
            }
            state.loading_more = false;

            let record_count = fetched.records.len();
            if record_count == 0 {
                state.page.has_more = false;
                debug!(page = next_page, "Empty gallery page, closing pagination");
                return Ok(false);
            }

            let appended = grouping::group_page(fetched.records);
            state.artworks.extend(appended);
            state.entries = grouping::display_list(&state.artworks);
            state.page = PageState {
                current_page: next_page,
                has_more: fetched.has_more,
                total_seen: state.page.total_seen + record_count,
            };
            (state.artworks.clone(), state.page, state.entries.len())
        };

        self.cache.set_all(&self.artworks_key(), &artworks_snapshot).await;
        self.cache.set_all(&self.page_state_key(), &page_snapshot).await;
        info!(
            collection = %self.profile.collection,
            page = next_page,
            entries = entry_count,
            "Appended gallery page"
        );
        Ok(true)
    }

    /// Infinite-scroll trigger: the host's end-of-list marker became
    /// visible. Speculative and idempotent.
    pub async fn notify_end_reached(&self) -> FetchResult<bool> {
        self.load_more().await
    }

    /// Apply a fresh like count to a record in the accumulated feed.
    ///
    /// Like counts are the one field that changes after grouping; every
    /// other change arrives as a new page or a full reload. The patched
    /// list is written through both tiers so a later restore keeps the
    /// count. Returns `false` when the record is not part of the feed.
    pub async fn apply_like(&self, record_id: &str, like_count: u64) -> bool {
        let artworks_snapshot = {
            let mut state = self.state.write().await;
            let mut changed = false;
            for artwork in &mut state.artworks {
                changed |= artwork.apply_like(record_id, like_count);
            }
            if !changed {
                debug!(record_id, "Like update for a record outside the feed");
                return false;
            }
            state.entries = grouping::display_list(&state.artworks);
            state.artworks.clone()
        };

        self.cache.set_all(&self.artworks_key(), &artworks_snapshot).await;
        debug!(record_id, like_count, "Applied like count to the feed");
        true
    }

    /// Drop in-memory state and supersede any in-flight response.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        let generation = state.generation + 1;
        *state = FeedState::new();
        state.generation = generation;
        debug!(collection = %self.profile.collection, "Gallery state reset");
    }

    /// Invalidate this context's cached listings and reload from the
    /// service. The reset comes first: a fetch settling mid-refresh is
    /// then superseded instead of writing the stale list back into the
    /// freshly cleared cache.
    pub async fn refresh(&self) -> FetchResult<InitialLoad> {
        self.reset().await;
        self.cache.invalidate_prefix(&self.profile.prefix).await;
        self.load_initial().await
    }

    /// Current render state.
    pub async fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.read().await;
        FeedSnapshot {
            artworks: state.artworks.clone(),
            entries: state.entries.clone(),
            page: state.page,
            loading_more: state.loading_more,
        }
    }

    pub async fn page_state(&self) -> PageState {
        self.state.read().await.page
    }

    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_loading_more(&self) -> bool {
        self.state.read().await.loading_more
    }
}
