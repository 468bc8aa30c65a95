//! Process-lifetime memoization of link probe results.
//!
//! Unlike a TTL cache, entries here are write-once: link health is
//! checked at most once per URL per process, and every later lookup
//! sees the same record.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::status::LinkStatus;

/// Hit and miss counts since the cache was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe write-once map from URL to [`LinkStatus`].
///
/// # Example
///
/// ```
/// use dowser_core::cache::StatusCache;
/// use dowser_core::status::LinkStatus;
///
/// let cache = StatusCache::new();
/// let status = LinkStatus::http("https://a.test/", "https://a.test/", 200, None);
///
/// let stored = cache.insert("https://a.test/", status);
/// assert!(stored.good());
/// assert!(cache.get("https://a.test/").is_some());
/// ```
#[derive(Debug, Default)]
pub struct StatusCache {
    entries: RwLock<HashMap<String, LinkStatus>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the recorded status for a URL, if one exists.
    ///
    /// Recovers (with a warning) if the lock is poisoned.
    pub fn get(&self, url: &str) -> Option<LinkStatus> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Cache read lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        match entries.get(url) {
            Some(status) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(status.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Records a status for a URL. The first writer wins: if a record
    /// already exists the new one is discarded, and the stored record is
    /// returned either way so racing writers converge on one value.
    pub fn insert(&self, url: &str, status: LinkStatus) -> LinkStatus {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Cache write lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        if let Some(existing) = entries.get(url) {
            debug!(url, "keeping first recorded status");
            return existing.clone();
        }

        debug!(url, code = status.http_code(), "recording status");
        entries.insert(url.to_string(), status.clone());
        status
    }

    /// Number of URLs recorded.
    pub fn len(&self) -> usize {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Cache read lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every record. Hit and miss counters are kept.
    pub fn clear(&self) {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Cache write lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
