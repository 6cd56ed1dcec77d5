// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity registry that announces its changes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::entity::{Entity, EntityRef};
use crate::event::{ChangeEvent, EventPublisher, EventSource};

/// Registry of entities that publishes a [`ChangeEvent`] for every change.
///
/// Adding or replacing an entity publishes [`ChangeEvent::Upserted`];
/// removing one publishes [`ChangeEvent::Removed`]. Changes are published in
/// the order they are applied. [`snapshot`](Self::snapshot) returns the
/// current content, ready to be passed to
/// [`DataConsumerAdapter::start`](crate::adapter::DataConsumerAdapter::start).
///
/// Listeners may read the registry while handling an event, but must not
/// modify it.
///
/// # Examples
///
/// ```
/// use data_consumer_adapter::adapter::{DataConsumerAdapter, EntityCatalog};
/// use data_consumer_adapter::entity::DeviceInfo;
/// use data_consumer_adapter::registry::EntityRegistry;
///
/// # fn main() -> data_consumer_adapter::Result<()> {
/// let registry = EntityRegistry::new();
/// registry.upsert(DeviceInfo::new("1", "Lamp"));
///
/// let adapter = DataConsumerAdapter::new("Mirror", EntityCatalog::new(), registry.publisher())?;
/// adapter.start(registry.snapshot())?;
///
/// registry.upsert(DeviceInfo::new("2", "Fan"));
/// registry.remove("1");
/// adapter.stop()?;
///
/// assert_eq!(adapter.with_registrar(|catalog| catalog.ids()), vec!["2"]);
/// # Ok(())
/// # }
/// ```
pub struct EntityRegistry<P = EventSource> {
    entities: RwLock<HashMap<String, EntityRef>>,
    /// Serializes change-then-publish so events follow application order.
    changes: Mutex<()>,
    publisher: P,
}

impl EntityRegistry<EventSource> {
    /// Creates an empty registry with its own synchronous event source.
    #[must_use]
    pub fn new() -> Self {
        Self::with_publisher(EventSource::new())
    }
}

impl<P: EventPublisher> EntityRegistry<P> {
    /// Creates an empty registry that publishes through `publisher`.
    #[must_use]
    pub fn with_publisher(publisher: P) -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            changes: Mutex::new(()),
            publisher,
        }
    }

    /// Returns the publisher consumers subscribe to.
    #[must_use]
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Adds or replaces an entity and publishes the change.
    ///
    /// Returns `true` if an entity with the same id was replaced.
    pub fn upsert<E: Entity + 'static>(&self, entity: E) -> bool {
        let entity: EntityRef = Arc::new(entity);
        self.upsert_ref(entity)
    }

    /// Adds or replaces a shared entity and publishes the change.
    ///
    /// Returns `true` if an entity with the same id was replaced.
    pub fn upsert_ref(&self, entity: EntityRef) -> bool {
        let _change = self.changes.lock();
        let replaced = self
            .entities
            .write()
            .insert(entity.id().to_string(), entity.clone())
            .is_some();

        tracing::debug!(entity_id = %entity.id(), replaced, "Entity upserted");
        self.publisher.publish(ChangeEvent::Upserted(entity));
        replaced
    }

    /// Removes an entity and publishes the change.
    ///
    /// Returns `true` if the entity was found and removed. Nothing is
    /// published otherwise.
    pub fn remove(&self, id: &str) -> bool {
        let _change = self.changes.lock();
        let removed = self.entities.write().remove(id).is_some();

        if removed {
            tracing::debug!(entity_id = %id, "Entity removed");
            self.publisher.publish(ChangeEvent::removed(id));
        }
        removed
    }

    /// Returns an entity by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<EntityRef> {
        self.entities.read().get(id).cloned()
    }

    /// Returns all entities, sorted by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EntityRef> {
        let mut entities: Vec<EntityRef> = self.entities.read().values().cloned().collect();
        entities.sort_by(|a, b| a.id().cmp(b.id()));
        entities
    }

    /// Returns the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns `true` if the registry holds no entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

impl Default for EntityRegistry<EventSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for EntityRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("len", &self.entities.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::entity::DeviceInfo;
    use crate::error::ListenerError;

    fn recording() -> (Arc<impl crate::event::EventListener>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let listener = Arc::new(move |event: &ChangeEvent| -> Result<(), ListenerError> {
            let tag = if event.is_removal() { "-" } else { "+" };
            sink.lock().push(format!("{tag}{}", event.entity_id()));
            Ok(())
        });
        (listener, log)
    }

    #[test]
    fn upsert_publishes() {
        let registry = EntityRegistry::new();
        let (listener, log) = recording();
        let _sub = registry.publisher().subscribe(&listener);

        assert!(!registry.upsert(DeviceInfo::new("1", "Lamp")));
        assert!(registry.upsert(DeviceInfo::new("1", "Desk lamp")));

        assert_eq!(*log.lock(), vec!["+1", "+1"]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("1").map(|e| e.name().to_string()).as_deref(), Some("Desk lamp"));
    }

    #[test]
    fn remove_publishes_only_known_ids() {
        let registry = EntityRegistry::new();
        let (listener, log) = recording();
        let _sub = registry.publisher().subscribe(&listener);

        registry.upsert(DeviceInfo::new("1", "Lamp"));
        assert!(registry.remove("1"));
        assert!(!registry.remove("1"));

        assert_eq!(*log.lock(), vec!["+1", "-1"]);
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_by_id() {
        let registry = EntityRegistry::new();
        registry.upsert(DeviceInfo::new("c", "C"));
        registry.upsert(DeviceInfo::new("a", "A"));
        registry.upsert(DeviceInfo::new("b", "B"));

        let ids: Vec<_> = registry.snapshot().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn listener_may_read_registry() {
        let registry = Arc::new(EntityRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let reader = Arc::clone(&registry);
        let sink = Arc::clone(&seen);
        let listener = Arc::new(move |_: &ChangeEvent| -> Result<(), ListenerError> {
            sink.lock().push(reader.len());
            Ok(())
        });
        let _sub = registry.publisher().subscribe(&listener);

        registry.upsert(DeviceInfo::new("1", "Lamp"));
        registry.remove("1");

        assert_eq!(*seen.lock(), vec![1, 0]);
    }
}
