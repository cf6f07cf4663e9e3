//! Fetch event notifications.
//!
//! Every call to [`FetcherEngine::retrieve_feed`](crate::engine::FetcherEngine::retrieve_feed)
//! announces its progress to registered listeners: a `Polled` event when the
//! attempt starts, then exactly one of `Retrieved`, `Unchanged`, or `Error`.
//! Delivery is synchronous, in subscription order, over a snapshot of the
//! subscriber list taken at publish time, so listeners may subscribe or
//! unsubscribe from within a callback without corrupting iteration.
//!
//! A panicking listener is isolated: the panic is caught, logged, and
//! delivery continues to the remaining listeners. The fetch in progress is
//! never aborted by a listener failure.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// A notification about one fetch attempt. Broadcast once, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// A fetch attempt has started for this URL.
    Polled { url: Url },
    /// A full response was retrieved and the cache entry was written.
    Retrieved { url: Url },
    /// The feed has not changed; the cached snapshot was returned.
    Unchanged { url: Url },
    /// The fetch failed. The same failure is also returned to the caller;
    /// the event carries its rendered cause.
    Error { url: Url, error: String },
}

impl FetchEvent {
    /// The feed URL this event concerns.
    pub fn url(&self) -> &Url {
        match self {
            FetchEvent::Polled { url }
            | FetchEvent::Retrieved { url }
            | FetchEvent::Unchanged { url }
            | FetchEvent::Error { url, .. } => url,
        }
    }
}

/// A subscriber to the fetch event stream.
///
/// Implemented automatically for closures; implement it directly when the
/// listener carries state.
pub trait FetchListener: Send + Sync {
    fn on_fetch_event(&self, event: &FetchEvent);
}

impl<F> FetchListener for F
where
    F: Fn(&FetchEvent) + Send + Sync,
{
    fn on_fetch_event(&self, event: &FetchEvent) {
        self(event)
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Synchronous broadcast bus for [`FetchEvent`]s.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<(ListenerId, Arc<dyn FetchListener>)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners are invoked in subscription order.
    pub fn subscribe(&self, listener: Arc<dyn FetchListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if the handle was already gone.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().expect("listener registry poisoned");
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Deliver an event to every listener registered at call time.
    ///
    /// The registry lock is released before any listener runs, so callbacks
    /// may call `subscribe`/`unsubscribe` freely; such changes take effect
    /// on the next publish.
    pub(crate) fn publish(&self, event: &FetchEvent) {
        let snapshot: Vec<(ListenerId, Arc<dyn FetchListener>)> = self
            .listeners
            .lock()
            .expect("listener registry poisoned")
            .clone();

        for (id, listener) in snapshot {
            let result = catch_unwind(AssertUnwindSafe(|| listener.on_fetch_event(event)));
            if result.is_err() {
                tracing::warn!(
                    listener_id = id.0,
                    event = ?event,
                    "Fetch listener panicked; continuing delivery to remaining listeners"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn polled(url: &str) -> FetchEvent {
        FetchEvent::Polled {
            url: Url::parse(url).unwrap(),
        }
    }

    fn recording_listener() -> (Arc<Mutex<Vec<FetchEvent>>>, Arc<dyn FetchListener>) {
        let seen: Arc<Mutex<Vec<FetchEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: Arc<dyn FetchListener> =
            Arc::new(move |event: &FetchEvent| sink.lock().unwrap().push(event.clone()));
        (seen, listener)
    }

    #[test]
    fn test_publish_reaches_all_listeners_in_order() {
        let bus = EventBus::new();
        let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3u32 {
            let order = Arc::clone(&order);
            bus.subscribe(Arc::new(move |_: &FetchEvent| {
                order.lock().unwrap().push(tag)
            }));
        }

        bus.publish(&polled("http://example.test/feed.xml"));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let (seen, listener) = recording_listener();

        let id = bus.subscribe(listener);
        bus.publish(&polled("http://example.test/feed.xml"));
        assert!(bus.unsubscribe(id));
        bus.publish(&polled("http://example.test/feed.xml"));

        assert_eq!(seen.lock().unwrap().len(), 1);
        // Second unsubscribe of the same handle is a no-op
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_panicking_listener_does_not_block_later_listeners() {
        let bus = EventBus::new();
        bus.subscribe(Arc::new(|_: &FetchEvent| panic!("listener bug")));
        let (seen, listener) = recording_listener();
        bus.subscribe(listener);

        bus.publish(&polled("http://example.test/feed.xml"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_event_url_accessor() {
        let url = Url::parse("http://example.test/feed.xml").unwrap();
        let event = FetchEvent::Error {
            url: url.clone(),
            error: "boom".to_string(),
        };
        assert_eq!(event.url(), &url);
    }
}
