// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription handles.

use std::fmt;

/// Unique identifier of a listener slot within one event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type Release = Box<dyn FnOnce() + Send + Sync>;

/// Handle that keeps a listener connected to an event source.
///
/// Dropping the handle (or calling [`cancel`](Self::cancel)) ends the
/// subscription. Delivery to other listeners is unaffected.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use data_consumer_adapter::error::ListenerError;
/// use data_consumer_adapter::event::{ChangeEvent, EventSource};
///
/// let source = EventSource::new();
/// let listener = Arc::new(|_: &ChangeEvent| -> Result<(), ListenerError> { Ok(()) });
///
/// let subscription = source.subscribe(&listener);
/// assert_eq!(source.listener_count(), 1);
///
/// subscription.cancel();
/// assert_eq!(source.listener_count(), 0);
/// ```
#[must_use = "dropping a subscription immediately unsubscribes"]
pub struct Subscription {
    id: Option<SubscriptionId>,
    release: Option<Release>,
}

impl Subscription {
    pub(crate) fn new<F>(id: SubscriptionId, release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            id: Some(id),
            release: Some(Box::new(release)),
        }
    }

    /// Creates a subscription that runs `release` when it is dropped.
    ///
    /// Custom event sources use this to hand a connection handle back to
    /// an adapter's connector.
    pub fn from_release<F>(release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            id: None,
            release: Some(Box::new(release)),
        }
    }

    /// Creates a subscription that is not connected to anything.
    pub fn inert() -> Self {
        Self {
            id: None,
            release: None,
        }
    }

    /// Returns the slot identifier, if this subscription belongs to a
    /// built-in event source.
    #[must_use]
    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    /// Returns `true` if dropping this handle still has an effect.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Ends the subscription now.
    pub fn cancel(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
