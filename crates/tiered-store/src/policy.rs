//! Expiry policies: how long entries in each key namespace stay fresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A maximum entry age for one key namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryRule {
    /// Key prefix the rule applies to, e.g. `"gallery-"`.
    pub prefix: String,
    /// Maximum age for entries under the prefix.
    pub max_age: Duration,
}

/// Per-namespace maximum entry ages.
///
/// Freshness is strict: an entry written at `stored_at` is fresh while
/// `now - stored_at` is less than the namespace's maximum age. Rules are
/// matched by the longest configured prefix; keys without a matching rule
/// use the default age.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryPolicy {
    default_max_age: Duration,
    rules: Vec<ExpiryRule>,
}

impl ExpiryPolicy {
    /// Policy where every key uses `default_max_age`.
    pub fn new(default_max_age: Duration) -> Self {
        Self {
            default_max_age,
            rules: Vec::new(),
        }
    }

    /// Add a namespace rule.
    pub fn rule<P: Into<String>>(mut self, prefix: P, max_age: Duration) -> Self {
        self.rules.push(ExpiryRule {
            prefix: prefix.into(),
            max_age,
        });
        self
    }

    /// Maximum age for entries under `key`.
    pub fn max_age_for(&self, key: &str) -> Duration {
        self.rules
            .iter()
            .filter(|rule| key.starts_with(rule.prefix.as_str()))
            .max_by_key(|rule| rule.prefix.len())
            .map(|rule| rule.max_age)
            .unwrap_or(self.default_max_age)
    }

    /// Whether an entry written at `stored_at` is still fresh at `now`.
    pub fn is_fresh(&self, key: &str, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let max_age = match chrono::Duration::from_std(self.max_age_for(key)) {
            Ok(max_age) => max_age,
            // An age too large for chrono arithmetic never expires.
            Err(_) => return true,
        };
        now - stored_at < max_age
    }

    /// Rules currently configured, in insertion order.
    pub fn rules(&self) -> &[ExpiryRule] {
        &self.rules
    }

    /// The fallback age for keys with no matching rule.
    pub fn default_max_age(&self) -> Duration {
        self.default_max_age
    }
}

impl Default for ExpiryPolicy {
    /// 24 hours for everything.
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}
