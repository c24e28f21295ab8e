//! Debounced search over a collection.
//!
//! [`SearchService`] turns a stream of keystrokes into at most one
//! network request per settled query. Every edit restarts the debounce
//! window; only the text that survives the full window is committed.
//! Committed queries page like the gallery feed, with results cached per
//! `(query, page)` in the context's search namespace.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use tiered_store::TierManager;

use crate::errors::FetchResult;
use crate::gallery::ContextProfile;
use crate::grouping;
use crate::keys;
use crate::models::{Artwork, DisplayEntry, PageState, SearchStatus};
use crate::remote::ContentService;

/// Cached payload for one `(query, page)` pair. Grouped artworks are
/// stored rather than raw records so a hit skips the grouping pass too.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedSearchPage {
    artworks: Vec<Artwork>,
    has_more: bool,
    record_count: usize,
}

#[derive(Debug)]
struct SearchState {
    status: SearchStatus,
    /// The committed query. Empty while idle or debouncing a first query.
    active_query: String,
    artworks: Vec<Artwork>,
    entries: Vec<DisplayEntry>,
    page: PageState,
    loading_more: bool,
    /// Bumped on every keystroke and reset; a pending debounce or
    /// response only applies if its generation is still current.
    generation: u64,
}

impl SearchState {
    fn new() -> Self {
        Self {
            status: SearchStatus::Idle,
            active_query: String::new(),
            artworks: Vec::new(),
            entries: Vec::new(),
            page: PageState::initial(),
            loading_more: false,
            generation: 0,
        }
    }

    fn clear_results(&mut self) {
        self.artworks.clear();
        self.entries.clear();
        self.page = PageState::initial();
        self.loading_more = false;
    }
}

struct SearchInner {
    service: Arc<dyn ContentService>,
    cache: TierManager,
    profile: ContextProfile,
    debounce: Duration,
    state: RwLock<SearchState>,
}

/// Render state handed to the host.
#[derive(Debug, Clone)]
pub struct SearchSnapshot {
    pub status: SearchStatus,
    pub query: String,
    pub entries: Vec<DisplayEntry>,
    pub page: PageState,
    pub loading_more: bool,
}

/// Debounced, cached search for one browsing context.
///
/// Cheap to clone; clones share state so the host can hand one to its
/// input handler and keep another for rendering.
#[derive(Clone)]
pub struct SearchService {
    inner: Arc<SearchInner>,
}

impl SearchService {
    pub fn new(
        service: Arc<dyn ContentService>,
        cache: TierManager,
        profile: ContextProfile,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SearchInner {
                service,
                cache,
                profile,
                debounce,
                state: RwLock::new(SearchState::new()),
            }),
        }
    }

    /// Record a keystroke.
    ///
    /// A non-empty query restarts the debounce window; the search runs
    /// only if no further edit arrives within it. Clearing the query
    /// resets to [`SearchStatus::Idle`] synchronously, before this call
    /// returns, and supersedes any pending debounce or in-flight fetch.
    pub async fn set_query<Q: Into<String>>(&self, query: Q) {
        let text = query.into().trim().to_string();

        let generation = {
            let mut state = self.inner.state.write().await;
            state.generation += 1;
            if text.is_empty() {
                state.status = SearchStatus::Idle;
                state.active_query.clear();
                state.clear_results();
                debug!("Search query cleared");
                return;
            }
            state.status = SearchStatus::Debouncing;
            state.generation
        };

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.inner.debounce).await;
            if let Err(e) = this.commit_if_current(generation, &text).await {
                warn!(query = %text, "Search failed: {e}");
            }
        });
    }

    /// Run the query that survived the debounce window, unless another
    /// edit superseded it while we slept.
    async fn commit_if_current(&self, generation: u64, query: &str) -> FetchResult<()> {
        {
            let mut state = self.inner.state.write().await;
            if state.generation != generation {
                debug!(query, "Debounced query superseded, skipping");
                return Ok(());
            }
            state.status = SearchStatus::Searching;
            state.active_query = query.to_string();
            state.clear_results();
        }
        info!(query, collection = %self.inner.profile.collection, "Search committed");
        self.run_page(generation, query, 1).await
    }

    /// Fetch one result page, cache-first, and merge it into state.
    async fn run_page(&self, generation: u64, query: &str, page_number: u32) -> FetchResult<()> {
        let key = keys::search_page_key(
            &self.inner.profile.search_prefix,
            &self.inner.profile.collection,
            query,
            page_number,
        );

        if let Some(cached) = self.inner.cache.get::<CachedSearchPage>(&key).await {
            debug!(query, page = page_number, "Search page served from cache");
            self.apply_page(generation, query, page_number, cached).await;
            return Ok(());
        }

        let fetched = match self
            .inner
            .service
            .search_page(
                &self.inner.profile.collection,
                query,
                page_number,
                self.inner.profile.page_size,
            )
            .await
        {
            Ok(fetched) => fetched,
            Err(e) => {
                let mut state = self.inner.state.write().await;
                if state.generation == generation {
                    state.loading_more = false;
                    state.status = SearchStatus::Loaded;
                }
                return Err(e);
            }
        };

        let record_count = fetched.records.len();
        let cached = CachedSearchPage {
            artworks: grouping::group_page(fetched.records),
            has_more: fetched.has_more,
            record_count,
        };
        self.inner.cache.set_all(&key, &cached).await;
        self.apply_page(generation, query, page_number, cached).await;
        Ok(())
    }

    /// Merge a page into state. Discarded without effect when the query
    /// or generation moved on while the page was in flight.
    async fn apply_page(&self, generation: u64, query: &str, page_number: u32, page: CachedSearchPage) {
        let mut state = self.inner.state.write().await;
        if state.generation != generation || state.active_query != query {
            debug!(query, page = page_number, "Dropping search page for superseded query");
            return;
        }
        state.loading_more = false;

        if page.record_count == 0 {
            state.page.has_more = false;
            state.status = SearchStatus::Loaded;
            debug!(query, page = page_number, "Empty search page, closing pagination");
            return;
        }

        state.artworks.extend(page.artworks);
        state.entries = grouping::display_list(&state.artworks);
        if self.inner.profile.sort_by_likes {
            // Stable sort: equal like counts keep their arrival order.
            state
                .entries
                .sort_by(|a, b| b.record.like_count.cmp(&a.record.like_count));
        }
        state.page = PageState {
            current_page: page_number,
            has_more: page.has_more,
            total_seen: state.page.total_seen + page.record_count,
        };
        state.status = SearchStatus::Loaded;
        debug!(
            query,
            page = page_number,
            entries = state.entries.len(),
            "Applied search page"
        );
    }

    /// Fetch and append the next result page for the committed query.
    ///
    /// Same discipline as the gallery feed: an in-flight guard makes
    /// repeated triggers no-ops, and an empty page closes pagination.
    pub async fn load_more(&self) -> FetchResult<bool> {
        let (query, next_page, generation) = {
            let mut state = self.inner.state.write().await;
            if state.active_query.is_empty() || state.status != SearchStatus::Loaded {
                return Ok(false);
            }
            if state.loading_more || !state.page.has_more {
                debug!(
                    loading = state.loading_more,
                    has_more = state.page.has_more,
                    "Ignoring speculative search load_more"
                );
                return Ok(false);
            }
            state.loading_more = true;
            (
                state.active_query.clone(),
                state.page.current_page + 1,
                state.generation,
            )
        };

        self.run_page(generation, &query, next_page).await?;
        Ok(true)
    }

    /// Apply a fresh like count to a record in the active results.
    ///
    /// Patches the accumulated artworks, re-sorts the display list when
    /// the context orders by likes, and rewrites every cached page of the
    /// active query that carries the record, so a later cache hit shows
    /// the new count. Returns `false` when the record is not part of the
    /// current results.
    pub async fn apply_like(&self, record_id: &str, like_count: u64) -> bool {
        let (query, pages) = {
            let mut state = self.inner.state.write().await;
            let mut changed = false;
            for artwork in &mut state.artworks {
                changed |= artwork.apply_like(record_id, like_count);
            }
            if !changed {
                debug!(record_id, "Like update for a record outside the results");
                return false;
            }
            state.entries = grouping::display_list(&state.artworks);
            if self.inner.profile.sort_by_likes {
                state
                    .entries
                    .sort_by(|a, b| b.record.like_count.cmp(&a.record.like_count));
            }
            (state.active_query.clone(), state.page.current_page)
        };

        for page_number in 1..=pages {
            let key = keys::search_page_key(
                &self.inner.profile.search_prefix,
                &self.inner.profile.collection,
                &query,
                page_number,
            );
            let Some(mut cached) = self.inner.cache.get::<CachedSearchPage>(&key).await else {
                continue;
            };
            let mut page_changed = false;
            for artwork in &mut cached.artworks {
                page_changed |= artwork.apply_like(record_id, like_count);
            }
            if page_changed {
                self.inner.cache.set_all(&key, &cached).await;
            }
        }
        debug!(record_id, like_count, "Applied like count to search results");
        true
    }

    pub async fn status(&self) -> SearchStatus {
        self.inner.state.read().await.status
    }

    pub async fn active_query(&self) -> String {
        self.inner.state.read().await.active_query.clone()
    }

    /// Current render state.
    pub async fn snapshot(&self) -> SearchSnapshot {
        let state = self.inner.state.read().await;
        SearchSnapshot {
            status: state.status,
            query: state.active_query.clone(),
            entries: state.entries.clone(),
            page: state.page,
            loading_more: state.loading_more,
        }
    }
}
