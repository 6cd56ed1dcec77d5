// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener capability and weak notifier handles.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use crate::error::ListenerError;

use super::ChangeEvent;

/// Anything that can receive registry change events.
///
/// Implementations must not block indefinitely. A returned error only
/// affects delivery to this listener; the event source keeps delivering to
/// every other listener.
///
/// Closures with the matching signature implement this trait:
///
/// ```
/// use std::sync::Arc;
/// use data_consumer_adapter::error::ListenerError;
/// use data_consumer_adapter::event::{ChangeEvent, EventSource};
///
/// let source = EventSource::new();
/// let listener = Arc::new(|event: &ChangeEvent| -> Result<(), ListenerError> {
///     println!("{} changed", event.entity_id());
///     Ok(())
/// });
/// let _subscription = source.subscribe(&listener);
/// source.notify(&ChangeEvent::removed("lamp-1"));
/// ```
pub trait EventListener: Send + Sync {
    /// Handles one change event.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener could not process the event.
    fn handle_event(&self, event: &ChangeEvent) -> Result<(), ListenerError>;
}

impl<F> EventListener for F
where
    F: Fn(&ChangeEvent) -> Result<(), ListenerError> + Send + Sync,
{
    fn handle_event(&self, event: &ChangeEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Invokes a listener, turning a panic into a [`ListenerError::Panicked`].
pub(crate) fn deliver(listener: &dyn EventListener, event: &ChangeEvent) -> Result<(), ListenerError> {
    match panic::catch_unwind(AssertUnwindSafe(|| listener.handle_event(event))) {
        Ok(result) => result,
        Err(payload) => Err(ListenerError::from_panic(payload.as_ref())),
    }
}

/// Non-owning handle used by custom event sources to reach an adapter.
///
/// A `Notifier` is handed to the connector passed to
/// [`DataConsumerAdapter::with_connector`](crate::adapter::DataConsumerAdapter::with_connector).
/// It does not keep the adapter alive: once the adapter is dropped,
/// [`notify`](Self::notify) returns `false` and the source should forget it.
#[derive(Clone)]
pub struct Notifier {
    target: Weak<dyn EventListener>,
}

impl Notifier {
    /// Creates a notifier for the given listener.
    #[must_use]
    pub fn new(target: Weak<dyn EventListener>) -> Self {
        Self { target }
    }

    /// Creates a notifier from a strong listener handle without keeping it alive.
    #[must_use]
    pub fn for_listener<L: EventListener + 'static>(listener: &Arc<L>) -> Self {
        let weak: Weak<L> = Arc::downgrade(listener);
        let target: Weak<dyn EventListener> = weak;
        Self { target }
    }

    /// Delivers an event to the listener.
    ///
    /// Listener failures are contained here. Returns `false` if the
    /// listener no longer exists.
    pub fn notify(&self, event: &ChangeEvent) -> bool {
        let Some(listener) = self.target.upgrade() else {
            return false;
        };

        if let Err(error) = deliver(listener.as_ref(), event) {
            tracing::trace!(
                entity_id = %event.entity_id(),
                error = %error,
                "Listener failed on notifier delivery"
            );
        }
        true
    }

    /// Returns `true` while the listener is still alive.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counter(AtomicU32);

    impl EventListener for Counter {
        fn handle_event(&self, _event: &ChangeEvent) -> Result<(), ListenerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn closure_is_listener() {
        let listener = |event: &ChangeEvent| {
            if event.entity_id().is_empty() {
                Err(ListenerError::rejected("empty id"))
            } else {
                Ok(())
            }
        };

        assert!(listener.handle_event(&ChangeEvent::removed("1")).is_ok());
        assert!(listener.handle_event(&ChangeEvent::removed("")).is_err());
    }

    #[test]
    fn deliver_catches_panics() {
        let listener = |_: &ChangeEvent| -> Result<(), ListenerError> { panic!("listener bug") };

        let result = deliver(&listener, &ChangeEvent::removed("1"));
        assert!(matches!(result, Err(ListenerError::Panicked(ref m)) if m == "listener bug"));
    }

    #[test]
    fn notifier_delivers_while_alive() {
        let counter = Arc::new(Counter(AtomicU32::new(0)));
        let notifier = Notifier::for_listener(&counter);

        assert!(notifier.is_connected());
        assert!(notifier.notify(&ChangeEvent::removed("1")));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notifier_does_not_keep_listener_alive() {
        let counter = Arc::new(Counter(AtomicU32::new(0)));
        let notifier = Notifier::for_listener(&counter);

        drop(counter);

        assert!(!notifier.is_connected());
        assert!(!notifier.notify(&ChangeEvent::removed("1")));
    }

    #[test]
    fn notifier_swallows_listener_errors() {
        let failing =
            Arc::new(|_: &ChangeEvent| -> Result<(), ListenerError> { Err(ListenerError::rejected("nope")) });
        let notifier = Notifier::for_listener(&failing);

        assert!(notifier.notify(&ChangeEvent::removed("1")));
    }

    #[test]
    fn notifier_debug() {
        let counter = Arc::new(Counter(AtomicU32::new(0)));
        let notifier = Notifier::for_listener(&counter);

        let debug = format!("{notifier:?}");
        assert!(debug.contains("Notifier"));
        assert!(debug.contains("connected: true"));
    }
}
