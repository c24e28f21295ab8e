//! Cache entry envelope and key/filename mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File extension used by the durable tier.
pub(crate) const ENTRY_EXTENSION: &str = "json";

/// A stored value together with its write time.
///
/// Both tiers persist this envelope. Expiry is always evaluated against
/// `stored_at`, so an entry promoted from one tier to another must keep its
/// original timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached value, kept as JSON so the envelope is type-agnostic.
    pub payload: serde_json::Value,
    /// When the value was written.
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Envelope stamped with the current time.
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            stored_at: Utc::now(),
        }
    }

    /// Envelope with an explicit write time. Useful when replaying entries
    /// whose age must be preserved.
    pub fn with_stored_at(payload: serde_json::Value, stored_at: DateTime<Utc>) -> Self {
        Self { payload, stored_at }
    }

    /// Age of the entry relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.stored_at
    }
}

/// Encode a cache key into a filesystem-safe filename.
///
/// Percent-encoding is applied character by character, so the mapping is
/// reversible and a key prefix always maps to a filename prefix.
pub(crate) fn key_to_filename(key: &str) -> String {
    format!("{}.{ENTRY_EXTENSION}", urlencoding::encode(key))
}

/// Decode a durable-tier filename back into its cache key. Returns `None`
/// for files the store did not write.
pub(crate) fn filename_to_key(name: &str) -> Option<String> {
    let stem = name.strip_suffix(&format!(".{ENTRY_EXTENSION}"))?;
    urlencoding::decode(stem).ok().map(|key| key.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_round_trip() {
        for key in [
            "gallery-wildlife-artworks",
            "search-wildlife-grey heron-p2",
            "scroll-gallery-wildlife",
            "admin/odd:key%with?chars",
            "ünïcode-key",
        ] {
            let name = key_to_filename(key);
            assert!(!name.contains('/'), "encoded name must be flat: {name}");
            assert_eq!(filename_to_key(&name).as_deref(), Some(key));
        }
    }

    #[test]
    fn encoding_preserves_prefixes() {
        let prefix = "search-wildlife-";
        let key = "search-wildlife-grey heron-p1";
        let encoded_prefix = urlencoding::encode(prefix).into_owned();
        let encoded_key = urlencoding::encode(key).into_owned();
        assert!(encoded_key.starts_with(&encoded_prefix));
    }

    #[test]
    fn foreign_files_are_rejected() {
        assert_eq!(filename_to_key("notes.txt"), None);
        assert_eq!(filename_to_key("nested.json.bak"), None);
    }

    #[test]
    fn age_is_relative_to_now() {
        let stored = Utc::now() - chrono::Duration::minutes(3);
        let entry = CacheEntry::with_stored_at(serde_json::json!(1), stored);
        let age = entry.age(Utc::now());
        assert!(age >= chrono::Duration::minutes(3));
        assert!(age < chrono::Duration::minutes(4));
    }
}
