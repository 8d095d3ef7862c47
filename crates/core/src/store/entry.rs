//! Cache entries, snapshots and entry lifetimes.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::RatingValue;

/// Current wall-clock time in unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One cached rating with its expiry.
///
/// Field names match the record format written by earlier releases
/// (`rating`, `expiration`), so existing persisted caches keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "rating")]
    pub value: RatingValue,
    /// Unix milliseconds.
    #[serde(rename = "expiration")]
    pub expires_at: i64,
}

impl CacheEntry {
    pub fn new(value: RatingValue, expires_at: i64) -> Self {
        Self { value, expires_at }
    }

    /// An entry is valid iff it expires strictly after `now`.
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

/// Full serialized copy of the cache map, exchanged between contexts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreSnapshot(pub HashMap<String, CacheEntry>);

impl StoreSnapshot {
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn get(&self, title: &str) -> Option<&CacheEntry> {
        self.0.get(title)
    }

    pub fn insert(&mut self, title: impl Into<String>, entry: CacheEntry) {
        self.0.insert(title.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Bounds for the randomized lifetime given to each new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLifetime {
    min: Duration,
    max: Duration,
}

impl CacheLifetime {
    /// Panics-free constructor: a `max` not above `min` collapses to a fixed lifetime of `min`.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max: max.max(min) }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Uniform sample from `[min, max)`, in milliseconds.
    pub fn sample_ms(&self) -> i64 {
        let min = i64::try_from(self.min.as_millis()).unwrap_or(i64::MAX);
        let max = i64::try_from(self.max.as_millis()).unwrap_or(i64::MAX);
        if max <= min {
            return min;
        }
        rand::thread_rng().gen_range(min..max)
    }
}

impl Default for CacheLifetime {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60), Duration::from_secs(7 * 24 * 60 * 60))
    }
}
