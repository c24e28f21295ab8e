//! Content service contract and implementations.
//!
//! The engine talks to its backing catalogue exclusively through
//! [`ContentService`]; caching, grouping and pagination all sit above this
//! seam, so a host can swap the HTTP client for anything that serves
//! pages.

pub mod http;
pub mod sample;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::FetchResult;
use crate::models::RemotePage;

pub use http::HttpContentService;
pub use sample::SampleContentService;

/// Fields an edit can change. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<String>,
}

/// Remote image catalogue: list, search and mutate.
///
/// Pages are 1-based. The `has_more` flag in a returned page is the
/// service's own claim; the pagination coordinator forces it to `false`
/// when a page arrives empty.
#[async_trait]
pub trait ContentService: Send + Sync {
    /// One page of a collection, in the catalogue's display order.
    async fn list_page(&self, collection: &str, page: u32, page_size: u32)
    -> FetchResult<RemotePage>;

    /// One page of matches for `query` within a collection.
    async fn search_page(
        &self,
        collection: &str,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> FetchResult<RemotePage>;

    /// Apply a metadata edit to one record.
    async fn update_metadata(
        &self,
        collection: &str,
        id: &str,
        update: MetadataUpdate,
    ) -> FetchResult<()>;

    /// Remove one record from the catalogue.
    async fn delete_record(&self, collection: &str, id: &str) -> FetchResult<()>;

    /// Register a like; returns the new count.
    async fn like(&self, collection: &str, id: &str) -> FetchResult<u64>;
}
