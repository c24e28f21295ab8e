//! Engine configuration.
//!
//! Loaded from TOML. Durations are human-readable strings ("7d", "5m",
//! "300ms") via [`duration_serde`]; a missing config file is created with
//! the defaults so a first run leaves an editable file behind.

pub mod duration_serde;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use tiered_store::ExpiryPolicy;

use crate::keys;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
}

/// Where the image catalogue lives and how pages are sized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout", with = "duration_serde::duration")]
    pub connect_timeout: Duration,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Cache tiers and per-namespace expiries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory for the durable tier. Memory-only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_directory: Option<PathBuf>,
    #[serde(default = "default_gallery_expiry", with = "duration_serde::duration")]
    pub gallery_expiry: Duration,
    #[serde(default = "default_admin_list_expiry", with = "duration_serde::duration")]
    pub admin_list_expiry: Duration,
    #[serde(default = "default_search_expiry", with = "duration_serde::duration")]
    pub search_expiry: Duration,
    #[serde(default = "default_admin_search_expiry", with = "duration_serde::duration")]
    pub admin_search_expiry: Duration,
    #[serde(default = "default_default_expiry", with = "duration_serde::duration")]
    pub default_expiry: Duration,
}

/// Debounce and ordering for the search pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_debounce", with = "duration_serde::duration")]
    pub debounce: Duration,
    /// Order results by like count instead of catalogue order.
    #[serde(default = "default_sort_by_likes")]
    pub sort_by_likes: bool,
}

/// Scroll capture and restoration timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    #[serde(default = "default_restore_interval", with = "duration_serde::duration")]
    pub restore_interval: Duration,
    #[serde(default = "default_restore_max_attempts")]
    pub restore_max_attempts: u32,
    #[serde(default = "default_capture_debounce", with = "duration_serde::duration")]
    pub capture_debounce: Duration,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_page_size() -> u32 {
    20
}

fn default_gallery_expiry() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

fn default_admin_list_expiry() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_search_expiry() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_admin_search_expiry() -> Duration {
    Duration::from_secs(2 * 60)
}

fn default_default_expiry() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_search_debounce() -> Duration {
    Duration::from_millis(300)
}

fn default_sort_by_likes() -> bool {
    true
}

fn default_restore_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_restore_max_attempts() -> u32 {
    30
}

fn default_capture_debounce() -> Duration {
    Duration::from_millis(500)
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout: default_connect_timeout(),
            page_size: default_page_size(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_directory: None,
            gallery_expiry: default_gallery_expiry(),
            admin_list_expiry: default_admin_list_expiry(),
            search_expiry: default_search_expiry(),
            admin_search_expiry: default_admin_search_expiry(),
            default_expiry: default_default_expiry(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: default_search_debounce(),
            sort_by_likes: default_sort_by_likes(),
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            restore_interval: default_restore_interval(),
            restore_max_attempts: default_restore_max_attempts(),
            capture_debounce: default_capture_debounce(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, writing the defaults there first if
    /// the file does not exist yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)
                .context("Failed to serialize default configuration")?;
            std::fs::write(path, contents)
                .with_context(|| format!("Failed to write default config to {}", path.display()))?;
            info!("Created default config file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Expiry policy for the cache tiers, derived from the `[cache]`
    /// section.
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(self.cache.default_expiry)
            .rule(keys::GALLERY_PREFIX, self.cache.gallery_expiry)
            .rule(keys::ADMIN_GALLERY_PREFIX, self.cache.admin_list_expiry)
            .rule(keys::SEARCH_PREFIX, self.cache.search_expiry)
            .rule(keys::ADMIN_SEARCH_PREFIX, self.cache.admin_search_expiry)
    }
}
