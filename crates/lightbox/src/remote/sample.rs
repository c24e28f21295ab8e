//! Deterministic sample catalogue for demos and tests.
//!
//! Fictional wildlife photography: standalone works plus a few multi-image
//! series whose indexes arrive deliberately shuffled, so the grouping
//! pipeline has something to straighten out. Ordering and paging are
//! stable across runs, which the pagination tests rely on.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::RwLock;

use super::{ContentService, MetadataUpdate};
use crate::errors::{FetchError, FetchResult};
use crate::models::{ImageRecord, RemotePage};

/// In-memory catalogue with stable ordering.
#[derive(Clone)]
pub struct SampleContentService {
    records: Arc<RwLock<Vec<ImageRecord>>>,
}

impl SampleContentService {
    /// Catalogue with the stock dataset.
    pub fn new() -> Self {
        Self::with_records(stock_records())
    }

    /// Catalogue over caller-supplied records.
    pub fn with_records(records: Vec<ImageRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    fn page_of(records: &[ImageRecord], page: u32, page_size: u32) -> RemotePage {
        let page = page.max(1) as usize;
        let page_size = page_size.max(1) as usize;
        let start = (page - 1) * page_size;
        let slice: Vec<ImageRecord> = records.iter().skip(start).take(page_size).cloned().collect();
        let has_more = start + slice.len() < records.len();
        RemotePage {
            records: slice,
            has_more,
        }
    }

    fn matches(record: &ImageRecord, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        let contains = |text: &str| text.to_lowercase().contains(&needle);
        contains(&record.title)
            || record.description.as_deref().is_some_and(contains)
            || record.scientific_name.as_deref().is_some_and(contains)
            || record.location.as_deref().is_some_and(contains)
            || record.series_title.as_deref().is_some_and(contains)
    }

    fn not_found(id: &str) -> FetchError {
        FetchError::status(404, format!("sample:///images/{id}"))
    }
}

impl Default for SampleContentService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentService for SampleContentService {
    async fn list_page(
        &self,
        _collection: &str,
        page: u32,
        page_size: u32,
    ) -> FetchResult<RemotePage> {
        let records = self.records.read().await;
        Ok(Self::page_of(&records, page, page_size))
    }

    async fn search_page(
        &self,
        _collection: &str,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> FetchResult<RemotePage> {
        let records = self.records.read().await;
        let matched: Vec<ImageRecord> = records
            .iter()
            .filter(|record| Self::matches(record, query))
            .cloned()
            .collect();
        Ok(Self::page_of(&matched, page, page_size))
    }

    async fn update_metadata(
        &self,
        _collection: &str,
        id: &str,
        update: MetadataUpdate,
    ) -> FetchResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        if let Some(title) = update.title {
            record.title = title;
        }
        if let Some(description) = update.description {
            record.description = Some(description);
        }
        if let Some(scientific_name) = update.scientific_name {
            record.scientific_name = Some(scientific_name);
        }
        if let Some(location) = update.location {
            record.location = Some(location);
        }
        if let Some(story) = update.story {
            record.story = Some(story);
        }
        Ok(())
    }

    async fn delete_record(&self, _collection: &str, id: &str) -> FetchResult<()> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn like(&self, _collection: &str, id: &str) -> FetchResult<u64> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        record.like_count += 1;
        Ok(record.like_count)
    }
}

/// Minimal standalone record, handy for tests.
pub fn standalone(id: &str, title: &str, like_count: u64) -> ImageRecord {
    ImageRecord {
        id: id.to_string(),
        title: title.to_string(),
        image_url: format!("https://images.example.net/portfolio/{id}.jpg"),
        description: None,
        scientific_name: None,
        location: None,
        captured_on: None,
        story: None,
        is_series: false,
        series_title: None,
        series_index: None,
        like_count,
        size_bytes: None,
        created_at: None,
    }
}

/// Minimal series member, handy for tests.
pub fn series_member(id: &str, series_title: &str, index: u32, like_count: u64) -> ImageRecord {
    let mut record = standalone(id, &format!("{series_title} {index}"), like_count);
    record.is_series = true;
    record.series_title = Some(series_title.to_string());
    record.series_index = Some(index);
    record
}

/// The stock dataset: 17 standalones, a five-image series with shuffled
/// indexes, a three-image series and a single-member series. 26 records.
pub fn stock_records() -> Vec<ImageRecord> {
    let detailed = |id: &str, title: &str, scientific: &str, location: &str, likes: u64, day: u32| {
        let mut record = standalone(id, title, likes);
        record.scientific_name = Some(scientific.to_string());
        record.location = Some(location.to_string());
        record.captured_on = Some(format!("March {day}, 2025"));
        record.created_at = Utc.with_ymd_and_hms(2025, 3, day, 9, 30, 0).single();
        record.size_bytes = Some(2_400_000 + u64::from(day) * 35_000);
        record
    };

    let egret = |id: &str, index: u32, likes: u64| {
        let mut record = series_member(id, "Egrets at First Light", index, likes);
        record.scientific_name = Some("Ardea alba".to_string());
        record.location = Some("Somerset Levels".to_string());
        record
    };
    let storm = |id: &str, index: u32, likes: u64| {
        let mut record = series_member(id, "Storm Over the Moor", index, likes);
        record.location = Some("Dartmoor".to_string());
        record
    };

    let mut records = vec![
        detailed("img-001", "Heron in the Shallows", "Ardea cinerea", "Norfolk Broads", 34, 1),
        detailed("img-002", "Kingfisher Dive", "Alcedo atthis", "River Test", 92, 2),
        detailed("img-003", "Red Fox at Dawn", "Vulpes vulpes", "Peak District", 57, 3),
        detailed("img-004", "Barn Owl Glide", "Tyto alba", "Norfolk Broads", 61, 4),
        detailed("img-005", "Otter Midstream", "Lutra lutra", "River Spey", 48, 5),
        detailed("img-006", "Stag on the Ridge", "Cervus elaphus", "Scottish Highlands", 73, 6),
        detailed("img-007", "Puffin Landing", "Fratercula arctica", "Skomer Island", 88, 7),
        detailed("img-008", "Mountain Hare in Snow", "Lepus timidus", "Cairngorms", 41, 8),
        detailed("img-009", "Curlew Calling", "Numenius arquata", "Northumberland Coast", 19, 9),
        detailed("img-010", "Badger at Dusk", "Meles meles", "Wye Valley", 27, 10),
        detailed("img-011", "Osprey with Catch", "Pandion haliaetus", "Loch Garten", 95, 11),
        detailed("img-012", "Grey Seal Haul-out", "Halichoerus grypus", "Farne Islands", 36, 12),
        detailed("img-013", "Bee-eater Pair", "Merops apiaster", "Norfolk Quarry", 52, 13),
        detailed("img-014", "Lapwing Display", "Vanellus vanellus", "Somerset Levels", 23, 14),
        detailed("img-015", "Pine Marten", "Martes martes", "Ardnamurchan", 44, 15),
        detailed("img-016", "Wren Singing", "Troglodytes troglodytes", "Wye Valley", 16, 16),
        detailed("img-017", "Dipper on the Weir", "Cinclus cinclus", "Derbyshire Dales", 29, 17),
    ];

    // Shuffled on purpose; grouping must put them back in index order.
    records.push(egret("img-018", 3, 31));
    records.push(egret("img-019", 1, 54));
    records.push(egret("img-020", 4, 22));
    records.push(egret("img-021", 5, 18));
    records.push(egret("img-022", 2, 47));

    records.push(storm("img-023", 2, 39));
    records.push(storm("img-024", 3, 25));
    records.push(storm("img-025", 1, 66));

    records.push(series_member("img-026", "Winter Coast", 1, 12));

    records
}
