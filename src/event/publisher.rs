// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common interface of the event sources.

use std::sync::Weak;

use super::{ChangeEvent, EventListener, Subscription};

/// An event source that listeners can subscribe to.
///
/// Implemented by [`EventSource`](super::EventSource) and
/// [`AsyncEventSource`](super::AsyncEventSource) so that adapters and the
/// [`EntityRegistry`](crate::registry::EntityRegistry) can work with either.
pub trait EventPublisher: Send + Sync {
    /// Adds a listener slot holding a non-owning reference.
    ///
    /// The slot lives until the returned subscription is released or the
    /// listener is dropped, whichever comes first.
    fn subscribe_weak(&self, listener: Weak<dyn EventListener>) -> Subscription;

    /// Delivers an event to every live listener.
    ///
    /// Never fails because of a listener.
    fn publish(&self, event: ChangeEvent);
}
