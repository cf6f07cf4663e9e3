//! Conditional-GET RSS/Atom feed fetching with a validator cache.
//!
//! `feedpoll` decides *whether* a feed needs refetching and detects
//! unchanged content cheaply. It remembers the validators (ETag,
//! Last-Modified) and a body fingerprint from each successful retrieval,
//! issues conditional requests on subsequent polls, and broadcasts typed
//! events (`Polled` / `Retrieved` / `Unchanged` / `Error`) to registered
//! listeners. What it does *not* do: render, persist, or index feed
//! content, or retry failed fetches — retry policy belongs to the caller.
//!
//! # Example
//!
//! ```no_run
//! use feedpoll::{FetcherConfig, FetcherEngine, MemoryFeedInfoCache};
//! use std::sync::Arc;
//! use url::Url;
//!
//! # async fn run() -> Result<(), feedpoll::FetchError> {
//! let cache = Arc::new(MemoryFeedInfoCache::new());
//! let engine = FetcherEngine::with_config(cache, FetcherConfig::default())?;
//!
//! let url = Url::parse("https://example.com/feed.xml").expect("valid url");
//! let feed = engine.retrieve_feed(&url).await?;
//! // A second call reuses the cached validators; an unchanged feed
//! // comes back from the cache without a body transfer.
//! let again = engine.retrieve_feed(&url).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;

pub use cache::{CacheEntry, FeedInfoCache, MemoryFeedInfoCache, Validators};
pub use client::{ConditionalFetchClient, FetchOutcome, RetrievedFeed};
pub use config::FetcherConfig;
pub use engine::FetcherEngine;
pub use error::FetchError;
pub use event::{EventBus, FetchEvent, FetchListener, ListenerId};

/// The parsed feed document type, re-exported from `feed-rs`.
///
/// Its internal structure is the parser's concern, not this crate's.
pub use feed_rs::model::Feed;
