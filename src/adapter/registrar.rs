// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registration extension points.

use crate::entity::EntityRef;
use crate::error::AdapterError;

/// Adapter-specific handling of registry changes.
///
/// A `Registrar` owns the adapter's view of the entity set. The
/// [`DataConsumerAdapter`](super::DataConsumerAdapter) keeps it behind its
/// registration lock, so both methods always run one at a time and never
/// during a snapshot burst.
///
/// Errors returned here are logged by the adapter and never reach the event
/// bus. The default bodies return [`AdapterError::Unimplemented`] so that a
/// missing override shows up in logs and tests instead of silently doing
/// nothing.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use data_consumer_adapter::adapter::Registrar;
/// use data_consumer_adapter::entity::{Entity, EntityRef};
/// use data_consumer_adapter::error::AdapterError;
///
/// #[derive(Default)]
/// struct Names(HashSet<String>);
///
/// impl Registrar for Names {
///     fn registrate(&mut self, entity: &EntityRef) -> Result<(), AdapterError> {
///         self.0.insert(entity.name().to_string());
///         Ok(())
///     }
/// }
/// ```
pub trait Registrar: Send + 'static {
    /// Adds or updates an entity.
    ///
    /// An entity whose id is already registered must be treated as an
    /// update of the existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity could not be registered.
    fn registrate(&mut self, entity: &EntityRef) -> Result<(), AdapterError> {
        let _ = entity;
        Err(AdapterError::Unimplemented {
            operation: "registrate",
        })
    }

    /// Removes the entity with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::UnknownEntity`] if the identifier is not
    /// registered, or another error if removal failed.
    fn deregistrate(&mut self, id: &str) -> Result<(), AdapterError> {
        let _ = id;
        Err(AdapterError::Unimplemented {
            operation: "deregistrate",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::DeviceInfo;

    struct Bare;

    impl Registrar for Bare {}

    #[test]
    fn default_registrate_is_unimplemented() {
        let entity = DeviceInfo::new("1", "Lamp").into_ref();
        let result = Bare.registrate(&entity);
        assert!(matches!(
            result,
            Err(AdapterError::Unimplemented {
                operation: "registrate"
            })
        ));
    }

    #[test]
    fn default_deregistrate_is_unimplemented() {
        let result = Bare.deregistrate("1");
        assert!(matches!(
            result,
            Err(AdapterError::Unimplemented {
                operation: "deregistrate"
            })
        ));
    }
}
