// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synchronous event source.

use std::fmt;
use std::sync::{Arc, Weak};

use super::listener::deliver;
use super::listener_set::ListenerSet;
use super::{ChangeEvent, EventListener, EventPublisher, Subscription};

/// Event source that delivers on the publisher's thread.
///
/// [`notify`](Self::notify) invokes every live listener in registration
/// order and returns once all of them have run. A listener that fails (by
/// returning an error or panicking) is skipped over; the remaining
/// listeners still receive the event.
///
/// Listeners are held weakly: subscribing never keeps a listener alive.
/// Cloning the source shares the same listener set.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use data_consumer_adapter::error::ListenerError;
/// use data_consumer_adapter::event::{ChangeEvent, EventSource};
///
/// let source = EventSource::new();
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&seen);
/// let listener = Arc::new(move |_: &ChangeEvent| -> Result<(), ListenerError> {
///     counter.fetch_add(1, Ordering::SeqCst);
///     Ok(())
/// });
/// let _subscription = source.subscribe(&listener);
///
/// source.notify(&ChangeEvent::removed("lamp-1"));
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct EventSource {
    listeners: Arc<ListenerSet<()>>,
}

impl EventSource {
    /// Creates an event source without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(ListenerSet::new()),
        }
    }

    /// Subscribes a listener.
    ///
    /// Subscribing the same listener twice creates two independent slots.
    pub fn subscribe<L: EventListener + 'static>(&self, listener: &Arc<L>) -> Subscription {
        let weak: Weak<L> = Arc::downgrade(listener);
        let listener: Weak<dyn EventListener> = weak;
        self.subscribe_weak(listener)
    }

    /// Delivers an event to every live listener, in registration order.
    pub fn notify(&self, event: &ChangeEvent) {
        for live in self.listeners.snapshot() {
            if let Err(error) = deliver(live.listener.as_ref(), event) {
                tracing::trace!(
                    subscription = %live.id,
                    entity_id = %event.entity_id(),
                    error = %error,
                    "Listener failed, continuing delivery"
                );
            }
        }
    }

    /// Returns the number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.live_count()
    }
}

impl EventPublisher for EventSource {
    fn subscribe_weak(&self, listener: Weak<dyn EventListener>) -> Subscription {
        let id = self.listeners.insert(listener, ());
        tracing::trace!(subscription = %id, "Listener subscribed");
        self.listeners.subscription(id)
    }

    fn publish(&self, event: ChangeEvent) {
        self.notify(&event);
    }
}

impl Default for EventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
