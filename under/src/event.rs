//! The event bus.
//!
//! Named channels, each with an insertion-order list of subscribers.
//! [`EventBus::emit`] fans a payload out to every subscriber of a channel and
//! awaits all of them; a subscriber that errors is logged and does not
//! prevent its siblings from running, nor the emission from completing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The channel a [`Router`](crate::Router) emits its built-in lifecycle
/// events on.
pub const SERVER_REQUEST: &str = "server:request";
/// The channel a [`Router`](crate::Router) emits its built-in lifecycle
/// events on.
pub const SERVER_RESPONSE: &str = "server:response";

/// A payload emitted on [`SERVER_REQUEST`] or [`SERVER_RESPONSE`].
#[derive(Debug, Clone)]
pub enum Event {
    /// Emitted once a request has been read off the wire, before dispatch.
    Request { method: http::Method, path: String },
    /// Emitted once the chain executor has produced a response.
    Response { status: http::StatusCode },
}

#[async_trait]
/// A listener on one or more event channels.
pub trait Subscriber: Send + Sync + 'static {
    /// Handles a single emitted event. A returned error is logged by
    /// [`EventBus::emit`]; it does not stop other subscribers from running.
    async fn handle(&self, event: &Event) -> Result<(), anyhow::Error>;
}

/// Owns every channel's subscriber list.
///
/// Subscriber lists are guarded by a plain [`std::sync::Mutex`], matching the
/// synchronization style the crate already uses for its shutdown signal
/// plumbing - subscribe/unsubscribe are quick, uncontended operations, so
/// there is no need for an async-aware lock here.
pub(crate) struct EventBus {
    channels: Mutex<HashMap<&'static str, Vec<Arc<dyn Subscriber>>>>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        EventBus {
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn subscribe(&self, channel: &'static str, subscriber: Arc<dyn Subscriber>) {
        let mut channels = self.channels.lock().unwrap();
        channels.entry(channel).or_default().push(subscriber);
    }

    /// Fans `event` out to every subscriber of `channel`, in the order they
    /// subscribed, awaiting all of them concurrently.
    pub(crate) async fn emit(&self, channel: &'static str, event: Event) {
        let subscribers = {
            let channels = self.channels.lock().unwrap();
            channels.get(channel).cloned().unwrap_or_default()
        };

        if subscribers.is_empty() {
            return;
        }

        let results =
            futures::future::join_all(subscribers.iter().map(|s| s.handle(&event))).await;
        for result in results {
            if let Err(error) = result {
                log::error!("subscriber on {:?} failed: {:#}", channel, error);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels = self.channels.lock().unwrap();
        f.debug_struct("EventBus")
            .field("channels", &channels.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscriber for Counter {
        async fn handle(&self, _event: &Event) -> Result<(), anyhow::Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Subscriber for Failing {
        async fn handle(&self, _event: &Event) -> Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("boom"))
        }
    }

    #[tokio::test]
    async fn emits_to_every_subscriber() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(SERVER_REQUEST, Arc::new(Counter(count.clone())));
        bus.subscribe(SERVER_REQUEST, Arc::new(Counter(count.clone())));

        bus.emit(
            SERVER_REQUEST,
            Event::Request {
                method: http::Method::GET,
                path: "/".to_owned(),
            },
        )
        .await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_subscriber_does_not_stop_emission() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(SERVER_REQUEST, Arc::new(Failing));
        bus.subscribe(SERVER_REQUEST, Arc::new(Counter(count.clone())));

        bus.emit(
            SERVER_REQUEST,
            Event::Request {
                method: http::Method::GET,
                path: "/".to_owned(),
            },
        )
        .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribed_channel_is_a_no_op() {
        let bus = EventBus::new();
        bus.emit(
            SERVER_RESPONSE,
            Event::Response {
                status: http::StatusCode::OK,
            },
        )
        .await;
    }
}
