// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Asynchronous event source.
//!
//! # Architecture
//!
//! ```text
//! publisher ── notify(event) ──┬──> queue(Sub 1) ──> task ──> spawn_blocking(listener 1)
//!                              ├──> queue(Sub 2) ──> task ──> spawn_blocking(listener 2)
//!                              └──> queue(Sub n) ──> task ──> spawn_blocking(listener n)
//!                                                               │
//!                                                      Err / panic
//!                                                               ↓
//!                                                        error handler
//! ```
//!
//! Every subscription owns an unbounded FIFO queue drained by its own tokio
//! task. Events reach each listener in the order they were published, while
//! different listeners make progress independently. Listener calls run on
//! tokio's blocking pool because listeners (adapters in particular) may wait
//! on locks.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::{Error, ListenerError, Result};

use super::listener::deliver;
use super::listener_set::ListenerSet;
use super::{ChangeEvent, EventListener, EventPublisher, Subscription, SubscriptionId};

/// Callback receiving every failed asynchronous delivery.
pub type ErrorHandler = Arc<dyn Fn(ListenerError) + Send + Sync>;

type Queue = mpsc::UnboundedSender<Arc<ChangeEvent>>;

/// Event source that never blocks the publisher.
///
/// [`notify`](Self::notify) only enqueues the event; delivery happens on
/// the tokio runtime the source was created with. Failed deliveries are
/// reported exactly once each to the error handler given at construction.
/// A handler that panics is contained.
///
/// # Shutdown
///
/// After [`shutdown`](Self::shutdown), `notify` discards events (logged at
/// `warn`) and `subscribe` returns an inert subscription. Events queued
/// before shutdown are still delivered.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use data_consumer_adapter::error::ListenerError;
/// use data_consumer_adapter::event::{AsyncEventSource, ChangeEvent};
///
/// # #[tokio::main]
/// # async fn main() -> data_consumer_adapter::Result<()> {
/// let source = AsyncEventSource::new(|error| eprintln!("delivery failed: {error}"))?;
///
/// let listener = Arc::new(|event: &ChangeEvent| -> Result<(), ListenerError> {
///     println!("{} changed", event.entity_id());
///     Ok(())
/// });
/// let _subscription = source.subscribe(&listener);
///
/// source.notify(&ChangeEvent::removed("lamp-1"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AsyncEventSource {
    inner: Arc<Inner>,
}

struct Inner {
    listeners: Arc<ListenerSet<Queue>>,
    runtime: Handle,
    on_error: ErrorHandler,
    shut_down: AtomicBool,
}

impl AsyncEventSource {
    /// Creates an asynchronous source on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`] when called outside a tokio runtime.
    pub fn new<F>(on_error: F) -> Result<Self>
    where
        F: Fn(ListenerError) + Send + Sync + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        Ok(Self::with_handle(runtime, on_error))
    }

    /// Creates an asynchronous source dispatching on the given runtime.
    #[must_use]
    pub fn with_handle<F>(runtime: Handle, on_error: F) -> Self
    where
        F: Fn(ListenerError) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                listeners: Arc::new(ListenerSet::new()),
                runtime,
                on_error: Arc::new(on_error),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Subscribes a listener.
    ///
    /// Subscribing the same listener twice creates two independent slots,
    /// each with its own queue.
    pub fn subscribe<L: EventListener + 'static>(&self, listener: &Arc<L>) -> Subscription {
        let weak: Weak<L> = Arc::downgrade(listener);
        let listener: Weak<dyn EventListener> = weak;
        self.subscribe_weak(listener)
    }

    /// Enqueues an event for every live listener and returns immediately.
    ///
    /// Takes the event by reference like [`EventSource::notify`](super::EventSource::notify);
    /// one shared copy is queued for all listeners.
    pub fn notify(&self, event: &ChangeEvent) {
        self.enqueue(Arc::new(event.clone()));
    }

    fn enqueue(&self, event: Arc<ChangeEvent>) {
        if self.is_shut_down() {
            tracing::warn!(
                entity_id = %event.entity_id(),
                "Event published after shutdown, discarding"
            );
            return;
        }

        for live in self.inner.listeners.snapshot() {
            if live.channel.send(Arc::clone(&event)).is_err() {
                // Delivery task already exited; the slot is dead.
                self.inner.listeners.remove(live.id);
            }
        }
    }

    /// Stops accepting events and disconnects every listener.
    ///
    /// Already queued events are still delivered. Calling this more than
    /// once has no further effect.
    pub fn shutdown(&self) {
        if !self.inner.shut_down.swap(true, Ordering::AcqRel) {
            tracing::debug!("Shutting down asynchronous event source");
            self.inner.listeners.clear();
        }
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Returns the number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.live_count()
    }
}

impl EventPublisher for AsyncEventSource {
    fn subscribe_weak(&self, listener: Weak<dyn EventListener>) -> Subscription {
        if self.is_shut_down() {
            tracing::warn!("Subscription requested after shutdown, ignoring");
            return Subscription::inert();
        }

        let (queue, events) = mpsc::unbounded_channel();
        let id = self.inner.listeners.insert(listener.clone(), queue);
        tracing::trace!(subscription = %id, "Listener subscribed");

        self.inner.runtime.spawn(drain_queue(
            id,
            listener,
            events,
            Arc::clone(&self.inner.on_error),
        ));

        self.inner.listeners.subscription(id)
    }

    fn publish(&self, event: ChangeEvent) {
        self.enqueue(Arc::new(event));
    }
}

impl fmt::Debug for AsyncEventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncEventSource")
            .field("listener_count", &self.listener_count())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

/// Delivers queued events to one listener, one at a time.
///
/// Ends when the slot is removed (queue closed) or the listener is dropped.
async fn drain_queue(
    id: SubscriptionId,
    listener: Weak<dyn EventListener>,
    mut events: mpsc::UnboundedReceiver<Arc<ChangeEvent>>,
    on_error: ErrorHandler,
) {
    while let Some(event) = events.recv().await {
        let Some(target) = listener.upgrade() else {
            tracing::trace!(subscription = %id, "Listener dropped, stopping delivery");
            break;
        };

        let outcome =
            tokio::task::spawn_blocking(move || deliver(target.as_ref(), &event)).await;

        let error = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(error)) => error,
            Err(join_error) => ListenerError::Panicked(join_error.to_string()),
        };
        report(&on_error, id, error);
    }
}

fn report(on_error: &ErrorHandler, id: SubscriptionId, error: ListenerError) {
    tracing::debug!(subscription = %id, error = %error, "Asynchronous delivery failed");
    if panic::catch_unwind(AssertUnwindSafe(|| on_error(error))).is_err() {
        tracing::warn!(subscription = %id, "Error handler panicked, discarding");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::mpsc::UnboundedSender;

    /// Forwards received entity ids into a channel.
    struct Forwarder(UnboundedSender<String>);

    impl EventListener for Forwarder {
        fn handle_event(&self, event: &ChangeEvent) -> std::result::Result<(), ListenerError> {
            let _ = self.0.send(event.entity_id().to_string());
            Ok(())
        }
    }

    fn ignore_errors(_: ListenerError) {}

    #[test]
    fn new_outside_runtime_fails() {
        let result = AsyncEventSource::new(ignore_errors);
        assert!(matches!(result, Err(Error::NoRuntime)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delivers_in_publish_order() {
        let source = AsyncEventSource::new(ignore_errors).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener = Arc::new(Forwarder(tx));
        let _sub = source.subscribe(&listener);

        for i in 0..20 {
            source.notify(&ChangeEvent::removed(i.to_string()));
        }

        for i in 0..20 {
            let id = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(id, i.to_string());
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn listener_errors_reach_handler_once() {
        let (err_tx, mut err_rx) = mpsc::unbounded_channel();
        let source = AsyncEventSource::new(move |error| {
            let _ = err_tx.send(error.to_string());
        })
        .unwrap();

        let failing = Arc::new(|event: &ChangeEvent| -> std::result::Result<(), ListenerError> {
            Err(ListenerError::rejected(event.entity_id()))
        });
        let _sub = source.subscribe(&failing);

        source.notify(&ChangeEvent::removed("a"));
        source.notify(&ChangeEvent::removed("b"));

        let first = tokio::time::timeout(Duration::from_secs(5), err_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), err_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, "listener rejected event: a");
        assert_eq!(second, "listener rejected event: b");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(err_rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn panicking_handler_does_not_stop_dispatch() {
        let source = AsyncEventSource::new(|_| panic!("handler bug")).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let failing = Arc::new(|_: &ChangeEvent| -> std::result::Result<(), ListenerError> {
            Err(ListenerError::rejected("always"))
        });
        let healthy = Arc::new(Forwarder(tx));
        let _s1 = source.subscribe(&failing);
        let _s2 = source.subscribe(&healthy);

        source.notify(&ChangeEvent::removed("1"));
        source.notify(&ChangeEvent::removed("2"));

        for expected in ["1", "2"] {
            let id = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(id, expected);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn notify_does_not_wait_for_slow_listener() {
        let source = AsyncEventSource::new(ignore_errors).unwrap();
        let slow = Arc::new(|_: &ChangeEvent| -> std::result::Result<(), ListenerError> {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        });
        let _sub = source.subscribe(&slow);

        let started = std::time::Instant::now();
        source.notify(&ChangeEvent::removed("1"));
        source.notify(&ChangeEvent::removed("2"));

        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_discards_new_events() {
        let source = AsyncEventSource::new(ignore_errors).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener = Arc::new(Forwarder(tx));
        let _sub = source.subscribe(&listener);

        source.shutdown();
        source.shutdown();
        source.notify(&ChangeEvent::removed("late"));

        assert!(source.is_shut_down());
        assert_eq!(source.listener_count(), 0);
        assert!(!source.subscribe(&listener).is_active());

        let next = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(next.is_err(), "event published after shutdown was delivered");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unsubscribed_listener_receives_nothing_more() {
        let source = AsyncEventSource::new(ignore_errors).unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);
        let listener = Arc::new(move |event: &ChangeEvent| -> std::result::Result<(), ListenerError> {
            log.lock().push(event.entity_id().to_string());
            Ok(())
        });

        let subscription = source.subscribe(&listener);
        subscription.cancel();
        source.notify(&ChangeEvent::removed("1"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(received.lock().is_empty());
        assert_eq!(source.listener_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn debug_format() {
        let source = AsyncEventSource::new(ignore_errors).unwrap();
        let debug = format!("{source:?}");
        assert!(debug.contains("AsyncEventSource"));
        assert!(debug.contains("shut_down: false"));
    }
}
