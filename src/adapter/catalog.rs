// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ready-made registrar keeping the latest value of every entity.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entity::EntityRef;
use crate::error::AdapterError;

use super::Registrar;

/// Registrar that mirrors the registry into a map keyed by entity id.
///
/// Registering a known id replaces the stored entity. Deregistering an
/// unknown id returns [`AdapterError::UnknownEntity`].
///
/// # Examples
///
/// ```
/// use data_consumer_adapter::adapter::{EntityCatalog, Registrar};
/// use data_consumer_adapter::entity::DeviceInfo;
///
/// let mut catalog = EntityCatalog::new();
/// catalog.registrate(&DeviceInfo::new("1", "Lamp").into_ref()).unwrap();
/// assert!(catalog.contains("1"));
///
/// catalog.deregistrate("1").unwrap();
/// assert!(catalog.deregistrate("1").is_err());
/// ```
#[derive(Debug, Default)]
pub struct EntityCatalog {
    entities: HashMap<String, EntityRef>,
}

impl EntityCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entity registered under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&EntityRef> {
        self.entities.get(id)
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Returns the registered ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.entities.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Registrar for EntityCatalog {
    fn registrate(&mut self, entity: &EntityRef) -> Result<(), AdapterError> {
        let previous = self
            .entities
            .insert(entity.id().to_string(), Arc::clone(entity));

        if previous.is_some() {
            tracing::debug!(
                entity_id = %entity.id(),
                name = %entity.name(),
                "Entity was already registered, updated"
            );
        } else {
            tracing::debug!(entity_id = %entity.id(), name = %entity.name(), "Entity registered");
        }
        Ok(())
    }

    fn deregistrate(&mut self, id: &str) -> Result<(), AdapterError> {
        match self.entities.remove(id) {
            Some(entity) => {
                tracing::debug!(entity_id = %id, name = %entity.name(), "Entity deregistered");
                Ok(())
            }
            None => Err(AdapterError::unknown_entity(id)),
        }
    }
}
