//! Core data model for the gallery engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One photograph as delivered by the content service.
///
/// Wire names are camelCase to match the portfolio backend's JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub title: String,
    /// Where the image bytes live. Doubles as the stable identity when
    /// deduplicating display entries.
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// When the photograph was taken, as free text from the photographer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<String>,
    /// Whether the record belongs to a titled series.
    #[serde(default)]
    pub is_series: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_title: Option<String>,
    /// 1-based position within the series, when the photographer set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_index: Option<u32>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ImageRecord {
    /// Filename part of the source URL. Used for synthetic ids when a
    /// record carries no title.
    pub fn source_filename(&self) -> &str {
        self.image_url.rsplit('/').next().unwrap_or(&self.image_url)
    }

    /// Stable identity for deduplication: the source URL when present,
    /// else the record id.
    pub fn dedup_key(&self) -> &str {
        if self.image_url.is_empty() {
            &self.id
        } else {
            &self.image_url
        }
    }
}

/// A standalone work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleArtwork {
    /// Synthetic id, `individual_` followed by the title or filename.
    pub id: String,
    pub record: ImageRecord,
}

/// A titled series. Members are kept sorted by their 1-based index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesArtwork {
    /// Synthetic id, `series_` followed by the series title.
    pub id: String,
    pub title: String,
    pub members: Vec<ImageRecord>,
}

impl SeriesArtwork {
    /// Representative image for the series, the lowest-indexed member.
    pub fn cover(&self) -> Option<&ImageRecord> {
        self.members.first()
    }
}

/// What the grouping engine produces. The single/series decision is made
/// exactly once, at grouping time; downstream code matches on the tag
/// instead of re-inferring it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Artwork {
    Single(SingleArtwork),
    Series(SeriesArtwork),
}

impl Artwork {
    pub fn id(&self) -> &str {
        match self {
            Artwork::Single(single) => &single.id,
            Artwork::Series(series) => &series.id,
        }
    }

    /// Number of image records behind this artwork.
    pub fn record_count(&self) -> usize {
        match self {
            Artwork::Single(_) => 1,
            Artwork::Series(series) => series.members.len(),
        }
    }

    /// Update the like count of the record with `record_id`, wherever it
    /// sits. Like counts are the one field that changes after grouping;
    /// any other edit means a refetch. Returns whether a record matched.
    pub fn apply_like(&mut self, record_id: &str, like_count: u64) -> bool {
        match self {
            Artwork::Single(single) => {
                if single.record.id == record_id {
                    single.record.like_count = like_count;
                    return true;
                }
                false
            }
            Artwork::Series(series) => {
                let mut changed = false;
                for member in &mut series.members {
                    if member.id == record_id {
                        member.like_count = like_count;
                        changed = true;
                    }
                }
                changed
            }
        }
    }
}

/// Series context attached to a separated display entry.
#[derive(Debug, Clone)]
pub struct SeriesContext {
    /// The complete series this entry was separated from.
    pub series: Arc<SeriesArtwork>,
    /// 1-based position among the members present.
    pub series_index: usize,
    /// Number of members present.
    pub series_total: usize,
}

/// One grid cell: a single record, optionally tagged with its series.
///
/// Display entries are derived state, recomputed from the artwork list
/// whenever it changes; only artworks are persisted.
#[derive(Debug, Clone)]
pub struct DisplayEntry {
    /// Unique display identity. Series members use `{series id}#{record id}`.
    pub id: String,
    pub record: ImageRecord,
    pub series: Option<SeriesContext>,
}

impl DisplayEntry {
    /// Key used when deduplicating the flattened list: the record's source
    /// reference, else the display identity.
    pub fn dedup_key(&self) -> &str {
        let key = self.record.dedup_key();
        if key.is_empty() { &self.id } else { key }
    }
}

/// Pagination cursor for one browsing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    /// Last page fetched, 1-based. Zero before anything was loaded.
    pub current_page: u32,
    pub has_more: bool,
    /// Records seen so far, counted before grouping.
    pub total_seen: usize,
}

impl PageState {
    /// State before the first load.
    pub fn initial() -> Self {
        Self {
            current_page: 0,
            has_more: true,
            total_seen: 0,
        }
    }
}

/// Saved scroll position, persisted across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollAnchor {
    pub offset_px: f64,
    pub captured_at: DateTime<Utc>,
}

/// One page as returned by the content service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePage {
    pub records: Vec<ImageRecord>,
    /// The service's own claim; the pagination coordinator overrides it to
    /// `false` when a page comes back empty.
    pub has_more: bool,
}

/// Where the search pipeline currently stands, for the host UI.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    /// No query active.
    #[default]
    Idle,
    /// Keystrokes arriving, debounce window open.
    Debouncing,
    /// Query committed, fetch in flight.
    Searching,
    /// Results ready.
    Loaded,
}

/// How the user arrived at a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Navigation {
    /// First entry into the view this session.
    FreshEntry,
    /// Coming back from a detail view.
    Return,
    /// Direct link into the view.
    DeepLink,
}

/// Scroll restoration lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Default)]
#[strum(serialize_all = "snake_case")]
pub enum RestoreState {
    #[default]
    Idle,
    /// Anchor found, restore task starting.
    Pending,
    /// Waiting for the content to grow tall enough.
    Restoring,
    /// Offset applied, anchor consumed.
    Restored,
    /// User input interrupted the attempt.
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_record_round_trips_camel_case() {
        let json = r#"{
            "id": "img-007",
            "title": "Otter Midstream",
            "imageUrl": "https://images.example.net/portfolio/img-007.jpg",
            "scientificName": "Lutra lutra",
            "isSeries": true,
            "seriesTitle": "River Dwellers",
            "seriesIndex": 2,
            "likeCount": 41
        }"#;

        let record: ImageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.series_index, Some(2));
        assert_eq!(record.series_title.as_deref(), Some("River Dwellers"));
        assert_eq!(record.like_count, 41);
        assert_eq!(record.source_filename(), "img-007.jpg");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["imageUrl"], record.image_url);
        assert_eq!(back["seriesIndex"], 2);
        // Unset optionals stay off the wire.
        assert!(back.get("description").is_none());
    }

    #[test]
    fn artwork_serde_is_kind_tagged() {
        let record = ImageRecord {
            id: "img-001".into(),
            title: "Heron in the Shallows".into(),
            image_url: "https://images.example.net/portfolio/img-001.jpg".into(),
            description: None,
            scientific_name: None,
            location: None,
            captured_on: None,
            story: None,
            is_series: false,
            series_title: None,
            series_index: None,
            like_count: 0,
            size_bytes: None,
            created_at: None,
        };
        let artwork = Artwork::Single(SingleArtwork {
            id: "individual_Heron in the Shallows".into(),
            record,
        });

        let value = serde_json::to_value(&artwork).unwrap();
        assert_eq!(value["kind"], "single");

        let back: Artwork = serde_json::from_value(value).unwrap();
        assert_eq!(back, artwork);
    }

    #[test]
    fn apply_like_patches_only_the_matching_record() {
        use crate::remote::sample;

        let mut single = Artwork::Single(SingleArtwork {
            id: "individual_Wren Singing".into(),
            record: sample::standalone("img-1", "Wren Singing", 3),
        });
        assert!(single.apply_like("img-1", 9));
        assert!(!single.apply_like("img-2", 1));
        let Artwork::Single(patched) = &single else {
            panic!("single became a series")
        };
        assert_eq!(patched.record.like_count, 9);

        let mut series = Artwork::Series(SeriesArtwork {
            id: "series_Storm Over the Moor".into(),
            title: "Storm Over the Moor".into(),
            members: vec![
                sample::series_member("img-2", "Storm Over the Moor", 1, 0),
                sample::series_member("img-3", "Storm Over the Moor", 2, 0),
            ],
        });
        assert!(series.apply_like("img-3", 12));
        assert!(!series.apply_like("img-9", 1));
        let Artwork::Series(patched) = &series else {
            panic!("series became a single")
        };
        assert_eq!(patched.members[0].like_count, 0);
        assert_eq!(patched.members[1].like_count, 12);
    }

    #[test]
    fn page_state_starts_open() {
        let state = PageState::initial();
        assert_eq!(state.current_page, 0);
        assert!(state.has_more);
        assert_eq!(state.total_seen, 0);
    }

    #[test]
    fn dedup_key_falls_back_to_id() {
        let record = ImageRecord {
            id: "img-x".into(),
            title: String::new(),
            image_url: String::new(),
            description: None,
            scientific_name: None,
            location: None,
            captured_on: None,
            story: None,
            is_series: false,
            series_title: None,
            series_index: None,
            like_count: 0,
            size_bytes: None,
            created_at: None,
        };
        assert_eq!(record.dedup_key(), "img-x");
    }
}
