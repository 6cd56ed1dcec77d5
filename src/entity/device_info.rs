// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plain device description.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::{Entity, EntityRef};

/// Minimal device description implementing [`Entity`].
///
/// # Examples
///
/// ```
/// use data_consumer_adapter::entity::{DeviceInfo, Entity};
///
/// let device = DeviceInfo::with_generated_id("Kitchen plug")
///     .with_description("Smart plug next to the fridge");
/// assert_eq!(device.name(), "Kitchen plug");
/// assert_eq!(device.id().len(), 36);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceInfo {
    id: String,
    name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    description: String,
}

impl DeviceInfo {
    /// Creates a device description with the given identifier and name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
        }
    }

    /// Creates a device description with a random UUID v4 identifier.
    #[must_use]
    pub fn with_generated_id(name: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), name)
    }

    /// Sets the free-form description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Wraps this device into a shared [`EntityRef`].
    #[must_use]
    pub fn into_ref(self) -> EntityRef {
        Arc::new(self)
    }
}

impl Entity for DeviceInfo {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
