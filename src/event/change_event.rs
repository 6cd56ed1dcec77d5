// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry change notifications.

use std::sync::Arc;

use crate::entity::{Entity, EntityRef};

/// A change in the entity registry.
///
/// Events are immutable once built and are shared read-only between every
/// listener that receives them.
///
/// # Examples
///
/// ```
/// use data_consumer_adapter::entity::DeviceInfo;
/// use data_consumer_adapter::event::ChangeEvent;
///
/// let added = ChangeEvent::upserted(DeviceInfo::new("lamp-1", "Desk lamp"));
/// let removed = ChangeEvent::removed("lamp-1");
///
/// assert_eq!(added.entity_id(), removed.entity_id());
/// assert!(added.is_upsert());
/// assert!(removed.is_removal());
/// ```
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// The entity with this identifier was removed and is no longer valid.
    Removed(String),

    /// The entity was added to the registry or changed.
    Upserted(EntityRef),
}

impl ChangeEvent {
    /// Creates a removal event.
    #[must_use]
    pub fn removed(id: impl Into<String>) -> Self {
        Self::Removed(id.into())
    }

    /// Creates an add/update event from an owned entity.
    #[must_use]
    pub fn upserted<E: Entity + 'static>(entity: E) -> Self {
        Self::Upserted(Arc::new(entity))
    }

    /// Returns the identifier of the entity this event is about.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        match self {
            Self::Removed(id) => id,
            Self::Upserted(entity) => entity.id(),
        }
    }

    /// Returns the carried entity for [`ChangeEvent::Upserted`].
    #[must_use]
    pub fn entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Upserted(entity) => Some(entity),
            Self::Removed(_) => None,
        }
    }

    /// Returns `true` if this is a removal.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::Removed(_))
    }

    /// Returns `true` if this is an add/update.
    #[must_use]
    pub fn is_upsert(&self) -> bool {
        matches!(self, Self::Upserted(_))
    }
}

impl From<EntityRef> for ChangeEvent {
    fn from(entity: EntityRef) -> Self {
        Self::Upserted(entity)
    }
}
