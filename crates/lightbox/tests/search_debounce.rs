use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use lightbox::config::Config;
use lightbox::errors::FetchResult;
use lightbox::gallery::ContextProfile;
use lightbox::models::{ImageRecord, RemotePage, SearchStatus};
use lightbox::remote::sample::{self, SampleContentService};
use lightbox::remote::{ContentService, MetadataUpdate};
use lightbox::search::SearchService;
use tiered_store::TierManager;

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Sample catalogue wrapper that records committed search queries and can
/// hold responses until released.
struct RecordingService {
    inner: SampleContentService,
    search_calls: AtomicU32,
    queries: Mutex<Vec<String>>,
    hold_searches: bool,
    release: Notify,
}

impl RecordingService {
    fn new() -> Arc<Self> {
        Self::over(sample::stock_records())
    }

    fn over(records: Vec<ImageRecord>) -> Arc<Self> {
        Arc::new(Self {
            inner: SampleContentService::with_records(records),
            search_calls: AtomicU32::new(0),
            queries: Mutex::new(Vec::new()),
            hold_searches: false,
            release: Notify::new(),
        })
    }

    fn gated() -> Arc<Self> {
        Arc::new(Self {
            inner: SampleContentService::new(),
            search_calls: AtomicU32::new(0),
            queries: Mutex::new(Vec::new()),
            hold_searches: true,
            release: Notify::new(),
        })
    }

    fn search_calls(&self) -> u32 {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn committed_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentService for RecordingService {
    async fn list_page(
        &self,
        collection: &str,
        page: u32,
        page_size: u32,
    ) -> FetchResult<RemotePage> {
        self.inner.list_page(collection, page, page_size).await
    }

    async fn search_page(
        &self,
        collection: &str,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> FetchResult<RemotePage> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        if self.hold_searches {
            self.release.notified().await;
        }
        self.inner.search_page(collection, query, page, page_size).await
    }

    async fn update_metadata(
        &self,
        collection: &str,
        id: &str,
        update: MetadataUpdate,
    ) -> FetchResult<()> {
        self.inner.update_metadata(collection, id, update).await
    }

    async fn delete_record(&self, collection: &str, id: &str) -> FetchResult<()> {
        self.inner.delete_record(collection, id).await
    }

    async fn like(&self, collection: &str, id: &str) -> FetchResult<u64> {
        self.inner.like(collection, id).await
    }
}

fn memory_cache() -> TierManager {
    TierManager::memory_only(Config::default().expiry_policy())
}

fn search_over(service: Arc<RecordingService>, cache: TierManager) -> SearchService {
    let profile = ContextProfile::public(&Config::default(), "wildlife");
    SearchService::new(service, cache, profile, DEBOUNCE)
}

async fn wait_for_status(search: &SearchService, wanted: SearchStatus) {
    for _ in 0..500 {
        if search.status().await == wanted {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("search never reached {wanted}");
}

#[tokio::test(start_paused = true)]
async fn rapid_keystrokes_commit_one_search_with_final_text() {
    let service = RecordingService::new();
    let search = search_over(service.clone(), memory_cache());

    // Four keystrokes inside one debounce window.
    for text in ["e", "eg", "egr", "egre"] {
        search.set_query(text).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(search.status().await, SearchStatus::Debouncing);

    wait_for_status(&search, SearchStatus::Loaded).await;
    assert_eq!(service.search_calls(), 1, "one committed search, not four");
    assert_eq!(service.committed_queries(), vec!["egre"]);
    assert_eq!(search.active_query().await, "egre");

    // "egre" matches the five-member egret series and nothing else.
    let snapshot = search.snapshot().await;
    assert_eq!(snapshot.entries.len(), 5);
    for entry in &snapshot.entries {
        assert_eq!(entry.series.as_ref().unwrap().series_total, 5);
    }
}

#[tokio::test(start_paused = true)]
async fn clearing_the_query_resets_synchronously() {
    let service = RecordingService::new();
    let search = search_over(service.clone(), memory_cache());

    search.set_query("egret").await;
    wait_for_status(&search, SearchStatus::Loaded).await;
    assert!(!search.snapshot().await.entries.is_empty());

    // The reset is visible the moment set_query returns.
    search.set_query("").await;
    assert_eq!(search.status().await, SearchStatus::Idle);
    assert!(search.snapshot().await.entries.is_empty());
    assert_eq!(search.active_query().await, "");

    // Clearing mid-debounce also kills the pending commit.
    search.set_query("her").await;
    search.set_query("").await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(search.status().await, SearchStatus::Idle);
    assert_eq!(service.search_calls(), 1, "cancelled debounce must not fetch");
}

#[tokio::test(start_paused = true)]
async fn results_sort_by_likes_with_ties_keeping_arrival_order() {
    let records = vec![
        sample::standalone("img-a", "Arctic Tern Hover", 10),
        sample::standalone("img-b", "Common Tern Pair", 5),
        sample::standalone("img-c", "Little Tern Dive", 10),
        sample::standalone("img-d", "Sandwich Tern Colony", 7),
    ];
    let service = RecordingService::over(records);
    let search = search_over(service, memory_cache());

    search.set_query("tern").await;
    wait_for_status(&search, SearchStatus::Loaded).await;

    let ids: Vec<String> = search
        .snapshot()
        .await
        .entries
        .iter()
        .map(|entry| entry.record.id.clone())
        .collect();
    // Likes descending; img-a and img-c tie at 10 and keep arrival order.
    assert_eq!(ids, vec!["img-a", "img-c", "img-d", "img-b"]);
}

#[tokio::test(start_paused = true)]
async fn applying_a_like_reorders_results_and_patches_the_cache() {
    let records = vec![
        sample::standalone("img-a", "Arctic Tern Hover", 10),
        sample::standalone("img-b", "Common Tern Pair", 5),
    ];
    let service = RecordingService::over(records);
    let cache = memory_cache();

    let search = search_over(service.clone(), cache.clone());
    search.set_query("tern").await;
    wait_for_status(&search, SearchStatus::Loaded).await;
    assert_eq!(search.snapshot().await.entries[0].record.id, "img-a");

    // img-b overtakes img-a once its new count lands.
    assert!(search.apply_like("img-b", 25).await);
    let snapshot = search.snapshot().await;
    assert_eq!(snapshot.entries[0].record.id, "img-b");
    assert_eq!(snapshot.entries[0].record.like_count, 25);
    assert!(!search.apply_like("img-zz", 1).await, "unknown records are a no-op");

    // Later cache hits see the patched page, still without a second fetch.
    let second = search_over(service.clone(), cache);
    second.set_query("tern").await;
    wait_for_status(&second, SearchStatus::Loaded).await;
    assert_eq!(service.search_calls(), 1, "patched page must come from cache");
    let restored = second.snapshot().await;
    assert_eq!(restored.entries[0].record.id, "img-b");
    assert_eq!(restored.entries[0].record.like_count, 25);
}

#[tokio::test(start_paused = true)]
async fn repeated_query_is_served_from_cache() {
    let service = RecordingService::new();
    let cache = memory_cache();

    let first = search_over(service.clone(), cache.clone());
    first.set_query("egret").await;
    wait_for_status(&first, SearchStatus::Loaded).await;
    assert_eq!(service.search_calls(), 1);

    // A fresh service over the same cache finds the cached page.
    let second = search_over(service.clone(), cache);
    second.set_query("egret").await;
    wait_for_status(&second, SearchStatus::Loaded).await;
    assert_eq!(service.search_calls(), 1, "cached page must not refetch");
    assert_eq!(second.snapshot().await.entries.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn search_results_page_like_the_gallery() {
    let records: Vec<ImageRecord> = (1..=12)
        .map(|n| sample::standalone(&format!("img-{n:02}"), &format!("Tern Study {n}"), 0))
        .collect();
    let service = RecordingService::over(records);

    let mut config = Config::default();
    config.remote.page_size = 5;
    config.search.sort_by_likes = false;
    let search = SearchService::new(
        service.clone(),
        memory_cache(),
        ContextProfile::public(&config, "wildlife"),
        DEBOUNCE,
    );

    search.set_query("tern").await;
    wait_for_status(&search, SearchStatus::Loaded).await;
    assert_eq!(search.snapshot().await.entries.len(), 5);

    assert!(search.load_more().await.unwrap());
    assert!(search.load_more().await.unwrap());

    let snapshot = search.snapshot().await;
    assert_eq!(snapshot.entries.len(), 12);
    assert_eq!(snapshot.page.current_page, 3);
    assert_eq!(snapshot.page.total_seen, 12);
    assert!(!snapshot.page.has_more);
    assert_eq!(service.search_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn late_response_for_cleared_query_is_discarded() {
    let service = RecordingService::gated();
    let search = search_over(service.clone(), memory_cache());

    search.set_query("egret").await;
    wait_for_status(&search, SearchStatus::Searching).await;
    assert_eq!(service.search_calls(), 1);

    // User clears the box while the fetch is still in flight.
    search.set_query("").await;
    assert_eq!(search.status().await, SearchStatus::Idle);

    // The response lands afterwards and must change nothing.
    service.release.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(search.status().await, SearchStatus::Idle);
    assert!(search.snapshot().await.entries.is_empty());
}
