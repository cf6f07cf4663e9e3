//! The fetch orchestrator: cache lookup, conditional fetch, cache update,
//! event emission.
//!
//! One [`retrieve_feed`](FetcherEngine::retrieve_feed) call performs at
//! most one network attempt and leaves the cache untouched on failure, so
//! a transient error never evicts a stale-but-valid snapshot. The cache is
//! an explicit handle passed in at construction; there is no global state.

use crate::cache::{CacheEntry, FeedInfoCache};
use crate::client::{ConditionalFetchClient, FetchOutcome, RetrievedFeed};
use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::event::{EventBus, FetchEvent, FetchListener, ListenerId};
use feed_rs::model::Feed;
use std::sync::Arc;
use url::Url;

/// Conditional feed fetcher with a validator cache and event notifications.
///
/// Safe to share across tasks: concurrent `retrieve_feed` calls for
/// different URLs proceed independently, and concurrent calls for the
/// same URL may both hit the network, with the final cache write being
/// last-writer-wins.
pub struct FetcherEngine {
    cache: Arc<dyn FeedInfoCache>,
    client: ConditionalFetchClient,
    bus: EventBus,
}

impl FetcherEngine {
    pub fn new(cache: Arc<dyn FeedInfoCache>, client: ConditionalFetchClient) -> Self {
        Self {
            cache,
            client,
            bus: EventBus::new(),
        }
    }

    /// Convenience constructor with a default-configured client.
    pub fn with_config(
        cache: Arc<dyn FeedInfoCache>,
        config: FetcherConfig,
    ) -> Result<Self, FetchError> {
        Ok(Self::new(cache, ConditionalFetchClient::new(config)?))
    }

    /// The cache handle this engine consults, e.g. for explicit eviction.
    pub fn cache(&self) -> &Arc<dyn FeedInfoCache> {
        &self.cache
    }

    /// Register a listener for fetch events.
    pub fn add_listener(&self, listener: Arc<dyn FetchListener>) -> ListenerId {
        self.bus.subscribe(listener)
    }

    /// Remove a previously registered listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Retrieve a feed, using the cache to avoid refetching unchanged
    /// content.
    ///
    /// Emits `Polled` when the attempt starts, then exactly one of
    /// `Retrieved` (full response, cache entry written), `Unchanged`
    /// (cached snapshot returned), or `Error` (failure, also returned to
    /// the caller; cache preserved).
    ///
    /// A feed is reported `Unchanged` in two cases: the server answered
    /// 304 to a conditional request, or the server sent a full body whose
    /// fingerprint matches the cached one (a server without conditional-GET
    /// support serving identical content). In the latter case the stored
    /// validators are refreshed but the cached snapshot is returned.
    pub async fn retrieve_feed(&self, url: &Url) -> Result<Feed, FetchError> {
        self.bus.publish(&FetchEvent::Polled { url: url.clone() });

        let prior = self.cache.get(url);
        let outcome = self
            .client
            .fetch(url, prior.as_ref().map(|entry| &entry.validators))
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.fail(url, err)),
        };

        match outcome {
            FetchOutcome::Unchanged => {
                let Some(entry) = prior else {
                    return Err(self.fail(url, FetchError::CacheInconsistency(url.clone())));
                };
                tracing::debug!(url = %url, "Feed unchanged, serving cached snapshot");
                self.bus.publish(&FetchEvent::Unchanged { url: url.clone() });
                Ok(entry.feed)
            }
            FetchOutcome::Retrieved(retrieved) => {
                let RetrievedFeed {
                    feed,
                    validators,
                    fingerprint,
                } = *retrieved;

                let same_body = prior
                    .as_ref()
                    .and_then(|entry| entry.fingerprint.as_deref())
                    == Some(fingerprint.as_str());

                if let (true, Some(entry)) = (same_body, prior) {
                    // Identical body from a server that ignored (or never
                    // received) our validators. Refresh the validators but
                    // keep reporting the truth: nothing changed.
                    self.cache.put(CacheEntry {
                        url: url.clone(),
                        validators,
                        fingerprint: Some(fingerprint),
                        feed: entry.feed.clone(),
                    });
                    tracing::debug!(url = %url, "Full response with unchanged content");
                    self.bus.publish(&FetchEvent::Unchanged { url: url.clone() });
                    return Ok(entry.feed);
                }

                self.cache.put(CacheEntry {
                    url: url.clone(),
                    validators,
                    fingerprint: Some(fingerprint),
                    feed: feed.clone(),
                });
                tracing::info!(url = %url, entries = feed.entries.len(), "Feed retrieved");
                self.bus.publish(&FetchEvent::Retrieved { url: url.clone() });
                Ok(feed)
            }
        }
    }

    /// Announce a failure to listeners and hand it back for propagation.
    /// Both channels always fire; neither substitutes for the other.
    fn fail(&self, url: &Url, err: FetchError) -> FetchError {
        tracing::warn!(url = %url, error = %err, "Feed fetch failed");
        self.bus.publish(&FetchEvent::Error {
            url: url.clone(),
            error: err.to_string(),
        });
        err
    }
}
