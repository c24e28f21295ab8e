//! File-backed durable tier.
//!
//! One JSON envelope per key, written flat under a base directory. The
//! filename is the percent-encoded key, so the mapping is reversible and a
//! directory scan recovers the exact key set for prefix invalidation.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::entry::{self, CacheEntry};
use crate::error::{Result, StoreError};

/// Durable tier rooted at a single directory. Survives restarts.
#[derive(Debug, Clone)]
pub struct DurableStore {
    base_dir: PathBuf,
}

impl DurableStore {
    /// Open the tier, creating `base_dir` if needed.
    pub async fn open<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StoreError::unavailable(format!("{}: {e}", base_dir.display())))?;
        debug!("Durable cache tier ready at {}", base_dir.display());
        Ok(Self { base_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(entry::key_to_filename(key))
    }

    /// Read the envelope for `key`. A missing file is `Ok(None)`; a file
    /// that cannot be read or decoded is an error so the caller can drop
    /// the key.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        serde_json::from_slice::<CacheEntry>(&bytes)
            .map(Some)
            .map_err(|e| StoreError::corrupted(key, e.to_string()))
    }

    /// Write the envelope for `key`, replacing any previous value.
    pub async fn insert(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let bytes = serde_json::to_vec(entry)?;
        tokio::fs::write(self.path_for(key), bytes).await?;
        Ok(())
    }

    /// Delete one key. Returns whether a file was removed.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Every key currently stored, decoded from filenames. Files the store
    /// did not write are skipped.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.base_dir).await?;
        while let Some(dirent) = dir.next_entry().await? {
            let name = dirent.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(key) = entry::filename_to_key(name) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Remove every key starting with `prefix`. Two phases, scan then
    /// delete, so the directory handle is not held across removals.
    pub async fn remove_prefix(&self, prefix: &str) -> Result<usize> {
        let keys = self.keys().await?;
        let mut removed = 0;
        for key in keys.iter().filter(|key| key.starts_with(prefix)) {
            match self.remove(key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!("Failed to remove durable entry '{key}': {e}"),
            }
        }
        Ok(removed)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn round_trip_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).await.unwrap();

        let entry = CacheEntry::new(json!({"page": 1}));
        store.insert("gallery-wildlife-artworks", &entry).await.unwrap();

        let read = store.get("gallery-wildlife-artworks").await.unwrap().unwrap();
        assert_eq!(read.payload, json!({"page": 1}));
        assert_eq!(read.stored_at, entry.stored_at);

        assert!(store.remove("gallery-wildlife-artworks").await.unwrap());
        assert!(!store.remove("gallery-wildlife-artworks").await.unwrap());
        assert!(store.get("gallery-wildlife-artworks").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prefix_removal_skips_other_namespaces() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).await.unwrap();

        for key in ["gallery-a", "gallery-b", "admin-gallery-a", "scroll-gallery-x"] {
            store.insert(key, &CacheEntry::new(json!(key))).await.unwrap();
        }

        let removed = store.remove_prefix("gallery-").await.unwrap();
        assert_eq!(removed, 2);

        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["admin-gallery-a", "scroll-gallery-x"]);
    }

    #[tokio::test]
    async fn scan_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).await.unwrap();

        store.insert("gallery-a", &CacheEntry::new(json!(1))).await.unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), b"not ours")
            .await
            .unwrap();

        assert_eq!(store.keys().await.unwrap(), vec!["gallery-a"]);
    }

    #[tokio::test]
    async fn undecodable_file_reports_corruption() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).await.unwrap();

        let name = super::entry::key_to_filename("gallery-bad");
        tokio::fs::write(dir.path().join(name), b"{ not json")
            .await
            .unwrap();

        match store.get("gallery-bad").await {
            Err(StoreError::Corrupted { key, .. }) => assert_eq!(key, "gallery-bad"),
            other => panic!("expected corruption error, got {other:?}"),
        }
    }
}
