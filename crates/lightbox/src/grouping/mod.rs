//! Series grouping, display separation and deduplication.
//!
//! Pure functions over pages of [`ImageRecord`]s: no I/O, no clocks, no
//! shared state. The whole pipeline can be re-run over an accumulated
//! artwork list at any time and lands on the same result, which is what
//! lets cache restores and appends share one code path.
//!
//! Grouping is per page. Series are not merged across page boundaries; a
//! series whose members span two pages shows up as two partial series.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use crate::models::{
    Artwork, DisplayEntry, ImageRecord, SeriesArtwork, SeriesContext, SingleArtwork,
};

/// Prefix for synthetic standalone ids.
const INDIVIDUAL_ID_PREFIX: &str = "individual_";
/// Prefix for synthetic series ids.
const SERIES_ID_PREFIX: &str = "series_";

/// Partition one page of records into artworks.
///
/// Records flagged as series members are grouped by series title, first
/// arrival fixing the series' position in the output; members are sorted
/// by their 1-based index, missing indexes last. A series-flagged record
/// without a title is kept as a standalone and logged, never dropped.
pub fn group_page(records: Vec<ImageRecord>) -> Vec<Artwork> {
    // title -> position in `artworks`, so arrival order is preserved
    let mut series_slots: HashMap<String, usize> = HashMap::new();
    let mut artworks: Vec<Artwork> = Vec::new();

    for record in records {
        match series_key(&record) {
            Some(title) => {
                if let Some(&slot) = series_slots.get(&title) {
                    if let Artwork::Series(series) = &mut artworks[slot] {
                        series.members.push(record);
                    }
                } else {
                    series_slots.insert(title.clone(), artworks.len());
                    artworks.push(Artwork::Series(SeriesArtwork {
                        id: format!("{SERIES_ID_PREFIX}{title}"),
                        title,
                        members: vec![record],
                    }));
                }
            }
            None => {
                let id = standalone_id(&record);
                artworks.push(Artwork::Single(SingleArtwork { id, record }));
            }
        }
    }

    for artwork in &mut artworks {
        if let Artwork::Series(series) = artwork {
            // Stable sort: duplicate or missing indexes keep arrival order.
            series.members.sort_by_key(|member| member.series_index.unwrap_or(u32::MAX));
        }
    }

    artworks
}

/// Flatten grouped artworks into grid entries.
///
/// Every series member becomes its own entry carrying position, member
/// count and a shared back-reference to the complete series; this also
/// applies to single-member series. Standalones map to one entry without
/// series context.
pub fn separate_for_display(artworks: &[Artwork]) -> Vec<DisplayEntry> {
    let mut entries = Vec::new();
    for artwork in artworks {
        match artwork {
            Artwork::Single(single) => entries.push(DisplayEntry {
                id: single.id.clone(),
                record: single.record.clone(),
                series: None,
            }),
            Artwork::Series(series) => {
                let shared = Arc::new(series.clone());
                let total = series.members.len();
                for (position, member) in series.members.iter().enumerate() {
                    // Keyed by member id, not position: a series split
                    // across page boundaries yields two partial series
                    // whose positions would collide.
                    entries.push(DisplayEntry {
                        id: format!("{}#{}", series.id, member.id),
                        record: member.clone(),
                        series: Some(SeriesContext {
                            series: Arc::clone(&shared),
                            series_index: position + 1,
                            series_total: total,
                        }),
                    });
                }
            }
        }
    }
    entries
}

/// Drop duplicate entries by their stable key, keeping the first.
pub fn dedup_entries(entries: Vec<DisplayEntry>) -> Vec<DisplayEntry> {
    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.dedup_key().to_string()))
        .collect()
}

/// The full separate-then-dedup pipeline over an accumulated artwork list.
pub fn display_list(artworks: &[Artwork]) -> Vec<DisplayEntry> {
    dedup_entries(separate_for_display(artworks))
}

/// Series title for a record, when it should be grouped. Logs and returns
/// `None` for the series-flagged-but-untitled case.
fn series_key(record: &ImageRecord) -> Option<String> {
    if !record.is_series {
        return None;
    }
    match record.series_title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => Some(title.to_string()),
        _ => {
            warn!(
                record_id = %record.id,
                "Series-flagged record has no series title, grouping as standalone"
            );
            None
        }
    }
}

fn standalone_id(record: &ImageRecord) -> String {
    let trimmed = record.title.trim();
    let tail = if trimmed.is_empty() {
        record.source_filename()
    } else {
        trimmed
    };
    format!("{INDIVIDUAL_ID_PREFIX}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::sample;
    use tracing_test::traced_test;

    #[test]
    fn series_members_sort_ascending_regardless_of_arrival() {
        let records = vec![
            sample::series_member("img-3", "Egrets at First Light", 3, 0),
            sample::series_member("img-1", "Egrets at First Light", 1, 0),
            sample::series_member("img-2", "Egrets at First Light", 2, 0),
        ];

        let artworks = group_page(records);
        assert_eq!(artworks.len(), 1);
        let Artwork::Series(series) = &artworks[0] else {
            panic!("expected a series");
        };
        assert_eq!(series.id, "series_Egrets at First Light");
        let indexes: Vec<u32> = series.members.iter().filter_map(|m| m.series_index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        // The cover follows the sorted order, not arrival order.
        assert_eq!(series.cover().map(|m| m.id.as_str()), Some("img-1"));
    }

    #[test]
    fn index_gaps_keep_ascending_order() {
        let records = vec![
            sample::series_member("img-5", "Sparse", 5, 0),
            sample::series_member("img-2", "Sparse", 2, 0),
        ];

        let artworks = group_page(records);
        let Artwork::Series(series) = &artworks[0] else {
            panic!("expected a series");
        };
        let indexes: Vec<u32> = series.members.iter().filter_map(|m| m.series_index).collect();
        assert_eq!(indexes, vec![2, 5]);
    }

    #[test]
    #[traced_test]
    fn untitled_series_member_becomes_standalone_with_warning() {
        let mut record = sample::standalone("img-9", "Lone Gull", 0);
        record.is_series = true;
        record.series_title = Some("   ".into());

        let artworks = group_page(vec![record]);
        assert_eq!(artworks.len(), 1);
        assert!(matches!(&artworks[0], Artwork::Single(single) if single.id == "individual_Lone Gull"));
        assert!(logs_contain("has no series title"));
    }

    #[test]
    fn untitled_record_falls_back_to_filename_id() {
        let mut record = sample::standalone("img-10", "", 0);
        record.image_url = "https://images.example.net/portfolio/img-10.jpg".into();

        let artworks = group_page(vec![record]);
        assert!(
            matches!(&artworks[0], Artwork::Single(single) if single.id == "individual_img-10.jpg")
        );
    }

    #[test]
    fn single_member_series_still_carries_series_context() {
        let records = vec![sample::series_member("img-20", "Winter Coast", 1, 0)];
        let entries = display_list(&group_page(records));

        assert_eq!(entries.len(), 1);
        let series = entries[0].series.as_ref().expect("series context");
        assert_eq!(series.series_index, 1);
        assert_eq!(series.series_total, 1);
        assert_eq!(series.series.title, "Winter Coast");
    }

    #[test]
    fn separation_tags_position_and_total() {
        let records = vec![
            sample::series_member("img-a", "Storm Over the Moor", 2, 0),
            sample::series_member("img-b", "Storm Over the Moor", 3, 0),
            sample::series_member("img-c", "Storm Over the Moor", 1, 0),
        ];
        let entries = display_list(&group_page(records));

        assert_eq!(entries.len(), 3);
        for (position, entry) in entries.iter().enumerate() {
            let series = entry.series.as_ref().expect("series context");
            assert_eq!(series.series_index, position + 1);
            assert_eq!(series.series_total, 3);
        }
        // Sorted by the photographer's index, not arrival.
        let ids: Vec<&str> = entries.iter().map(|e| e.record.id.as_str()).collect();
        assert_eq!(ids, vec!["img-c", "img-a", "img-b"]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let first = sample::standalone("img-1", "Heron in the Shallows", 5);
        let mut second = sample::standalone("img-2", "Duplicate Upload", 9);
        second.image_url = first.image_url.clone();

        let entries = display_list(&group_page(vec![first, second]));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.id, "img-1");
    }

    #[test]
    fn pipeline_is_idempotent_over_accumulated_artworks() {
        let mut records = sample::stock_records();
        records.truncate(12);

        let artworks = group_page(records);
        let entries_once = display_list(&artworks);

        // Feed the already-grouped records back through the pipeline.
        let regrouped: Vec<ImageRecord> = artworks
            .iter()
            .flat_map(|artwork| match artwork {
                Artwork::Single(single) => vec![single.record.clone()],
                Artwork::Series(series) => series.members.clone(),
            })
            .collect();
        let entries_twice = display_list(&group_page(regrouped));

        let keys = |entries: &[DisplayEntry]| -> Vec<String> {
            entries.iter().map(|e| e.id.clone()).collect()
        };
        assert_eq!(keys(&entries_once), keys(&entries_twice));
    }

    #[test]
    fn standalone_and_series_interleave_in_arrival_order() {
        let records = vec![
            sample::standalone("img-1", "Red Fox at Dawn", 0),
            sample::series_member("img-2", "Egrets at First Light", 2, 0),
            sample::standalone("img-3", "Barn Owl Glide", 0),
            sample::series_member("img-4", "Egrets at First Light", 1, 0),
        ];

        let artworks = group_page(records);
        let ids: Vec<&str> = artworks.iter().map(|a| a.id()).collect();
        assert_eq!(
            ids,
            vec![
                "individual_Red Fox at Dawn",
                "series_Egrets at First Light",
                "individual_Barn Owl Glide",
            ]
        );
    }
}
