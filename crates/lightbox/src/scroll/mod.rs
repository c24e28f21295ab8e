//! Scroll position capture and restoration.
//!
//! Returning to a long feed should land the user where they left, but the
//! content arrives asynchronously: right after navigation the page is too
//! short to scroll to the saved offset. [`ScrollRestorer`] saves the
//! offset on the durable tier, and on a [`Navigation::Return`] polls the
//! viewport until the content is tall enough to apply it, giving up after
//! a bounded number of attempts. Any user input cancels the attempt at
//! once; the user has taken over and must not be yanked elsewhere.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tiered_store::{Tier, TierManager};

use crate::config::ScrollConfig;
use crate::keys;
use crate::models::{Navigation, RestoreState, ScrollAnchor};

/// Host-side view of the scrollable page.
///
/// Measurements are taken on every retry; implementations should return
/// the current values, not cached ones.
pub trait Viewport: Send + Sync {
    /// Total scrollable height in pixels.
    fn content_height(&self) -> f64;
    /// Visible height in pixels.
    fn viewport_height(&self) -> f64;
    /// Jump to the given offset from the top.
    fn apply_offset(&self, offset_px: f64);
}

/// Timing knobs for capture and restore.
#[derive(Debug, Clone, Copy)]
pub struct ScrollSettings {
    /// Delay between height re-measurements while restoring.
    pub restore_interval: Duration,
    /// Measurement attempts before giving up.
    pub restore_max_attempts: u32,
    /// Quiet time before a reported offset is persisted.
    pub capture_debounce: Duration,
}

impl From<&ScrollConfig> for ScrollSettings {
    fn from(config: &ScrollConfig) -> Self {
        Self {
            restore_interval: config.restore_interval,
            restore_max_attempts: config.restore_max_attempts,
            capture_debounce: config.capture_debounce,
        }
    }
}

#[derive(Debug)]
struct ScrollState {
    restore: RestoreState,
    /// Last-wins counter for debounced captures.
    capture_generation: u64,
    /// Token for the running restore task. Replaced on every new attempt.
    cancel: CancellationToken,
}

struct ScrollInner {
    cache: TierManager,
    settings: ScrollSettings,
    anchor_key: String,
    state: RwLock<ScrollState>,
}

/// Per-context scroll anchor manager.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ScrollRestorer {
    inner: Arc<ScrollInner>,
}

impl ScrollRestorer {
    pub fn new(
        cache: TierManager,
        settings: ScrollSettings,
        context_prefix: &str,
        collection: &str,
    ) -> Self {
        Self {
            inner: Arc::new(ScrollInner {
                cache,
                settings,
                anchor_key: keys::scroll_anchor_key(context_prefix, collection),
                state: RwLock::new(ScrollState {
                    restore: RestoreState::Idle,
                    capture_generation: 0,
                    cancel: CancellationToken::new(),
                }),
            }),
        }
    }

    pub async fn state(&self) -> RestoreState {
        self.inner.state.read().await.restore
    }

    /// Saved anchor, if any. Read-only peek; does not consume it.
    pub async fn saved_anchor(&self) -> Option<ScrollAnchor> {
        self.inner.cache.get(&self.inner.anchor_key).await
    }

    /// Report the current scroll offset.
    ///
    /// Persisted only after [`ScrollSettings::capture_debounce`] of quiet;
    /// a newer report supersedes older pending ones, so the anchor always
    /// holds the last position seen.
    pub async fn record_offset(&self, offset_px: f64) {
        let generation = {
            let mut state = self.inner.state.write().await;
            state.capture_generation += 1;
            state.capture_generation
        };

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.inner.settings.capture_debounce).await;
            if this.inner.state.read().await.capture_generation != generation {
                return;
            }
            this.capture_now(offset_px).await;
        });
    }

    /// Persist the offset immediately, e.g. right before navigating away.
    /// Supersedes any pending debounced capture.
    pub async fn capture_now(&self, offset_px: f64) {
        {
            let mut state = self.inner.state.write().await;
            state.capture_generation += 1;
        }
        let anchor = ScrollAnchor {
            offset_px,
            captured_at: Utc::now(),
        };
        self.inner
            .cache
            .set(Tier::Durable, &self.inner.anchor_key, &anchor)
            .await;
        debug!(offset = offset_px, key = %self.inner.anchor_key, "Scroll anchor captured");
    }

    /// Entry point on navigation into the list view.
    ///
    /// Starts a restore attempt only for [`Navigation::Return`] with a
    /// saved anchor; fresh entries and deep links start at the top.
    /// Returns the restoration state after the decision.
    pub async fn arrive(&self, navigation: Navigation, viewport: Arc<dyn Viewport>) -> RestoreState {
        if navigation != Navigation::Return {
            debug!(%navigation, "Not a return navigation, skipping scroll restore");
            return self.state().await;
        }

        let Some(anchor) = self.saved_anchor().await else {
            debug!("No scroll anchor saved, starting at the top");
            return self.state().await;
        };

        let cancel = {
            let mut state = self.inner.state.write().await;
            if matches!(state.restore, RestoreState::Pending | RestoreState::Restoring) {
                return state.restore;
            }
            state.restore = RestoreState::Pending;
            state.cancel = CancellationToken::new();
            state.cancel.clone()
        };

        info!(
            offset = anchor.offset_px,
            age_secs = (Utc::now() - anchor.captured_at).num_seconds(),
            "Starting scroll restore"
        );
        let this = self.clone();
        tokio::spawn(async move {
            this.run_restore(anchor, viewport, cancel).await;
        });
        RestoreState::Pending
    }

    async fn run_restore(
        &self,
        anchor: ScrollAnchor,
        viewport: Arc<dyn Viewport>,
        cancel: CancellationToken,
    ) {
        {
            let mut state = self.inner.state.write().await;
            if state.restore != RestoreState::Pending {
                return;
            }
            state.restore = RestoreState::Restoring;
        }

        // First tick fires immediately, so the common case where content
        // is already tall enough applies without waiting an interval.
        let mut ticker = tokio::time::interval(self.inner.settings.restore_interval);
        for attempt in 1..=self.inner.settings.restore_max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(attempt, "Scroll restore cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let scrollable = viewport.content_height() - viewport.viewport_height();
            if scrollable >= anchor.offset_px {
                if cancel.is_cancelled() {
                    return;
                }
                viewport.apply_offset(anchor.offset_px);
                {
                    let mut state = self.inner.state.write().await;
                    if state.restore != RestoreState::Restoring {
                        return;
                    }
                    state.restore = RestoreState::Restored;
                }
                self.inner.cache.remove(&self.inner.anchor_key).await;
                info!(offset = anchor.offset_px, attempt, "Scroll position restored");
                return;
            }
            debug!(
                attempt,
                scrollable,
                needed = anchor.offset_px,
                "Content not tall enough yet"
            );
        }

        // Gave up: the saved offset points past content that no longer
        // exists. Consume the anchor so the next return does not retry.
        {
            let mut state = self.inner.state.write().await;
            if state.restore != RestoreState::Restoring {
                return;
            }
            state.restore = RestoreState::Idle;
        }
        self.inner.cache.remove(&self.inner.anchor_key).await;
        debug!(
            offset = anchor.offset_px,
            attempts = self.inner.settings.restore_max_attempts,
            "Gave up waiting for content, staying at the top"
        );
    }

    /// The user scrolled, tapped or typed. Cancels any active restore
    /// immediately; the anchor is left in place for the next return.
    pub async fn notify_user_input(&self) {
        let mut state = self.inner.state.write().await;
        if matches!(state.restore, RestoreState::Pending | RestoreState::Restoring) {
            state.restore = RestoreState::Cancelled;
            state.cancel.cancel();
            debug!("Scroll restore cancelled by user input");
        }
    }
}
