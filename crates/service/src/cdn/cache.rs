//! Logical URL → physical path memo with a fixed TTL.
//!
//! Expiry is only checked on read; expired entries stay in the map until they
//! are overwritten or invalidated, so memory is bounded by the number of
//! distinct URLs seen.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    physical_path: PathBuf,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ResolutionCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResolutionCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    /// Hit only when present and `expires_at > now`.
    pub fn get(&self, url: &str, now: DateTime<Utc>) -> Option<PathBuf> {
        let entry = self.entries.get(url)?;
        if entry.expires_at > now {
            debug!(%url, "resolution cache hit");
            Some(entry.physical_path.clone())
        } else {
            debug!(%url, "resolution cache entry expired");
            None
        }
    }

    pub fn put(&self, url: &str, physical_path: PathBuf, now: DateTime<Utc>) {
        self.entries.insert(url.to_string(), CacheEntry { physical_path, expires_at: now + self.ttl });
    }

    /// Returns whether an entry existed.
    pub fn invalidate(&self, url: &str) -> bool {
        self.entries.remove(url).is_some()
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
