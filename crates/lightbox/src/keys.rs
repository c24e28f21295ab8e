//! Persisted cache key conventions.
//!
//! Every component builds its keys through these helpers so namespaces
//! stay disjoint and prefix invalidation can clear one surface without
//! touching the others. The shapes are a convention for cross-reload
//! continuity, not a public contract.

/// Public gallery listings, 7-day expiry by default.
pub const GALLERY_PREFIX: &str = "gallery-";
/// Admin listings, short expiry so edits show up quickly.
pub const ADMIN_GALLERY_PREFIX: &str = "admin-gallery-";
/// Public search results.
pub const SEARCH_PREFIX: &str = "search-";
/// Admin search results.
pub const ADMIN_SEARCH_PREFIX: &str = "admin-search-";
/// Scroll anchors.
pub const SCROLL_PREFIX: &str = "scroll-";
/// Shared aspect-ratio snapshot, one key for all contexts.
pub const DIMENSIONS_KEY: &str = "dimensions-aspect-ratios";

/// Accumulated artwork snapshot for one context and collection.
pub fn artworks_key(context_prefix: &str, collection: &str) -> String {
    format!("{context_prefix}{collection}-artworks")
}

/// Pagination cursor companion to [`artworks_key`].
pub fn page_state_key(context_prefix: &str, collection: &str) -> String {
    format!("{context_prefix}{collection}-page-state")
}

/// One page of results for one committed query.
pub fn search_page_key(search_prefix: &str, collection: &str, query: &str, page: u32) -> String {
    format!("{search_prefix}{collection}-{query}-p{page}")
}

/// Scroll anchor for one context and collection.
pub fn scroll_anchor_key(context_prefix: &str, collection: &str) -> String {
    format!("{SCROLL_PREFIX}{context_prefix}{collection}")
}
