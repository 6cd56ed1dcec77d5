// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entities tracked by the registry.
//!
//! The notification core treats entities as opaque values. It only needs a
//! stable identifier and a human-readable name, which the [`Entity`] trait
//! exposes. Entities are shared as [`EntityRef`] handles so that one event
//! can be delivered to many adapters without copying.
//!
//! # Examples
//!
//! ```
//! use data_consumer_adapter::entity::{DeviceInfo, Entity};
//!
//! let device = DeviceInfo::new("lamp-1", "Desk lamp");
//! assert_eq!(device.id(), "lamp-1");
//! assert_eq!(device.name(), "Desk lamp");
//! ```

mod device_info;

use std::fmt;
use std::sync::Arc;

pub use device_info::DeviceInfo;

/// An identifiable value tracked by the registry.
///
/// Two entities with the same [`id`](Entity::id) describe the same
/// logical entity; a later one is an update of the earlier one.
pub trait Entity: fmt::Debug + Send + Sync {
    /// Returns the stable identifier of this entity.
    fn id(&self) -> &str;

    /// Returns the human-readable name of this entity.
    fn name(&self) -> &str;
}

/// Shared, read-only handle to an entity.
pub type EntityRef = Arc<dyn Entity>;
