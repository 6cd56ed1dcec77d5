// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Weakly-held listener slots shared by the event sources.
//!
//! Slots keep registration order. Each slot carries a per-source payload
//! (nothing for the synchronous source, a delivery queue for the
//! asynchronous one). Listeners that have been dropped are pruned lazily
//! whenever a snapshot is taken.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::{EventListener, Subscription, SubscriptionId};

struct Slot<S> {
    id: SubscriptionId,
    listener: Weak<dyn EventListener>,
    channel: S,
}

/// A listener that was alive when the snapshot was taken.
pub(crate) struct LiveListener<S> {
    pub id: SubscriptionId,
    pub listener: Arc<dyn EventListener>,
    pub channel: S,
}

pub(crate) struct ListenerSet<S> {
    next_id: AtomicU64,
    slots: RwLock<Vec<Slot<S>>>,
}

impl<S: Clone + Send + Sync + 'static> ListenerSet<S> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            slots: RwLock::new(Vec::new()),
        }
    }

    /// Appends a slot and returns its identifier.
    pub fn insert(&self, listener: Weak<dyn EventListener>, channel: S) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.write().push(Slot {
            id,
            listener,
            channel,
        });
        id
    }

    /// Returns a handle that removes the slot when released.
    pub fn subscription(self: &Arc<Self>, id: SubscriptionId) -> Subscription {
        let set = Arc::downgrade(self);
        Subscription::new(id, move || {
            if let Some(set) = set.upgrade() {
                set.remove(id);
            }
        })
    }

    /// Removes a slot. Returns `true` if it existed.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|slot| slot.id != id);
        let removed = slots.len() != before;
        if removed {
            tracing::trace!(subscription = %id, "Listener unsubscribed");
        }
        removed
    }

    /// Copies the live listeners, in registration order.
    ///
    /// Dropped listeners found while copying are pruned afterwards.
    pub fn snapshot(&self) -> Vec<LiveListener<S>> {
        let mut stale = false;
        let live: Vec<_> = {
            let slots = self.slots.read();
            slots
                .iter()
                .filter_map(|slot| {
                    let listener = slot.listener.upgrade();
                    stale |= listener.is_none();
                    listener.map(|listener| LiveListener {
                        id: slot.id,
                        listener,
                        channel: slot.channel.clone(),
                    })
                })
                .collect()
        };

        if stale {
            self.prune();
        }
        live
    }

    /// Removes every slot whose listener has been dropped.
    pub fn prune(&self) {
        self.slots.write().retain(|slot| {
            let alive = slot.listener.strong_count() > 0;
            if !alive {
                tracing::trace!(subscription = %slot.id, "Pruning dropped listener");
            }
            alive
        });
    }

    /// Removes every slot.
    pub fn clear(&self) {
        self.slots.write().clear();
    }

    /// Returns the number of slots whose listener is still alive.
    pub fn live_count(&self) -> usize {
        self.slots
            .read()
            .iter()
            .filter(|slot| slot.listener.strong_count() > 0)
            .count()
    }
}
