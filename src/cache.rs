//! Feed info cache: retrieval metadata keyed by feed URL.
//!
//! The cache remembers, per feed, the validators the server handed back on
//! the last successful retrieval (ETag, Last-Modified), a fingerprint of
//! the raw body, and the parsed feed snapshot itself. The engine consults
//! it before every fetch and overwrites the entry after every full
//! retrieval; entries are never expired automatically.
//!
//! [`FeedInfoCache`] is a trait so hosts can supply their own backing
//! store; [`MemoryFeedInfoCache`] is the stock in-memory implementation.

use chrono::{DateTime, Utc};
use feed_rs::model::Feed;
use std::collections::HashMap;
use std::sync::RwLock;
use url::Url;

/// Validators extracted from a prior response, echoed back on the next
/// conditional request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    /// Entity tag, stored verbatim including any quotes or `W/` prefix.
    pub etag: Option<String>,
    /// Last-Modified timestamp, parsed from the response header.
    pub last_modified: Option<DateTime<Utc>>,
}

impl Validators {
    /// True if at least one validator is present, i.e. a conditional
    /// request is possible at all.
    pub fn is_usable(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }
}

/// Cached retrieval metadata for one feed URL.
///
/// Created on the first successful retrieval, overwritten in place on
/// every subsequent full retrieval, and never touched by failed fetches.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The feed URL this entry belongs to.
    pub url: Url,
    /// Validators for the next conditional request. May be empty if the
    /// server sent none, in which case the next fetch is unconditional.
    pub validators: Validators,
    /// SHA-256 hex digest of the raw response body, used to recognize an
    /// unchanged feed served by a server without conditional-GET support.
    pub fingerprint: Option<String>,
    /// The parsed feed snapshot from the last full retrieval.
    pub feed: Feed,
}

/// A store mapping feed URLs to their cached retrieval metadata.
///
/// Implementations must tolerate concurrent `get`/`put`/`clear` across
/// keys; per-key replacement is atomic and last-writer-wins. No lock may
/// be held on behalf of a caller across network I/O.
pub trait FeedInfoCache: Send + Sync {
    /// Pure lookup; no side effects.
    fn get(&self, url: &Url) -> Option<CacheEntry>;

    /// Insert or overwrite the entry for `entry.url`. No merge logic.
    fn put(&self, entry: CacheEntry);

    /// Remove the entry for `url` if present. Idempotent.
    fn clear(&self, url: &Url);

    /// Remove every entry, forcing full refetches for all feeds.
    fn clear_all(&self);
}

/// In-memory [`FeedInfoCache`] backed by a `RwLock<HashMap>`.
///
/// Entries live for the lifetime of the cache unless explicitly cleared.
#[derive(Debug, Default)]
pub struct MemoryFeedInfoCache {
    entries: RwLock<HashMap<Url, CacheEntry>>,
}

impl MemoryFeedInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached feeds.
    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FeedInfoCache for MemoryFeedInfoCache {
    fn get(&self, url: &Url) -> Option<CacheEntry> {
        self.entries
            .read()
            .expect("cache lock poisoned")
            .get(url)
            .cloned()
    }

    fn put(&self, entry: CacheEntry) {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(entry.url.clone(), entry);
    }

    fn clear(&self, url: &Url) {
        self.entries.write().expect("cache lock poisoned").remove(url);
    }

    fn clear_all(&self) {
        self.entries.write().expect("cache lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn empty_feed() -> Feed {
        feed_rs::parser::parse(
            br#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"# as &[u8],
        )
        .unwrap()
    }

    fn entry_for(url: &Url, etag: &str) -> CacheEntry {
        CacheEntry {
            url: url.clone(),
            validators: Validators {
                etag: Some(etag.to_string()),
                last_modified: None,
            },
            fingerprint: None,
            feed: empty_feed(),
        }
    }

    #[test]
    fn test_get_missing_returns_none() {
        let cache = MemoryFeedInfoCache::new();
        let url = Url::parse("http://example.test/feed.xml").unwrap();
        assert!(cache.get(&url).is_none());
    }

    #[test]
    fn test_put_then_get() {
        let cache = MemoryFeedInfoCache::new();
        let url = Url::parse("http://example.test/feed.xml").unwrap();
        cache.put(entry_for(&url, "\"v1\""));

        let entry = cache.get(&url).expect("entry should exist");
        assert_eq!(entry.validators.etag.as_deref(), Some("\"v1\""));
    }

    #[test]
    fn test_put_overwrites_last_writer_wins() {
        let cache = MemoryFeedInfoCache::new();
        let url = Url::parse("http://example.test/feed.xml").unwrap();
        cache.put(entry_for(&url, "\"v1\""));
        cache.put(entry_for(&url, "\"v2\""));

        assert_eq!(cache.len(), 1);
        let entry = cache.get(&url).unwrap();
        assert_eq!(entry.validators.etag.as_deref(), Some("\"v2\""));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let cache = MemoryFeedInfoCache::new();
        let url = Url::parse("http://example.test/feed.xml").unwrap();
        cache.put(entry_for(&url, "\"v1\""));

        cache.clear(&url);
        assert!(cache.get(&url).is_none());
        // Clearing a missing key never errors
        cache.clear(&url);
    }

    #[test]
    fn test_clear_all() {
        let cache = MemoryFeedInfoCache::new();
        let a = Url::parse("http://example.test/a.xml").unwrap();
        let b = Url::parse("http://example.test/b.xml").unwrap();
        cache.put(entry_for(&a, "\"a\""));
        cache.put(entry_for(&b, "\"b\""));

        cache.clear_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_url_normalization_shares_entries() {
        // Url::parse normalizes, so textually different but equivalent
        // references hit the same entry.
        let cache = MemoryFeedInfoCache::new();
        let a = Url::parse("HTTP://Example.Test/feed.xml").unwrap();
        let b = Url::parse("http://example.test/feed.xml").unwrap();
        cache.put(entry_for(&a, "\"v1\""));
        assert!(cache.get(&b).is_some());
    }

    #[test]
    fn test_concurrent_put_and_get() {
        let cache = Arc::new(MemoryFeedInfoCache::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                let url = Url::parse(&format!("http://example.test/{i}.xml")).unwrap();
                for _ in 0..100 {
                    cache.put(entry_for(&url, "\"v\""));
                    assert!(cache.get(&url).is_some());
                    cache.clear(&url);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
