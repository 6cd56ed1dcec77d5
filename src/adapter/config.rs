// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter configuration types.

use crate::error::{Error, Result};

/// How an adapter reports `deregistrate` calls for unknown identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UnknownEntityPolicy {
    /// Log the failure at ERROR level.
    #[default]
    Report,
    /// Log the failure at DEBUG level only.
    Ignore,
}

/// Configuration for a data consumer adapter.
///
/// # Examples
///
/// ```
/// use data_consumer_adapter::adapter::{AdapterConfig, UnknownEntityPolicy};
///
/// let config = AdapterConfig::new("Dashboard")
///     .with_unknown_entity_policy(UnknownEntityPolicy::Ignore);
///
/// assert_eq!(config.name, "Dashboard");
///
/// // A plain name converts into a default configuration
/// let config: AdapterConfig = "Dashboard".into();
/// assert_eq!(config.unknown_entity_policy, UnknownEntityPolicy::Report);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdapterConfig {
    /// Adapter name used in logs and diagnostics. Must not be empty.
    pub name: String,
    /// Policy for deregistering unknown identifiers.
    #[cfg_attr(feature = "serde", serde(default))]
    pub unknown_entity_policy: UnknownEntityPolicy,
}

impl AdapterConfig {
    /// Creates a configuration with the given adapter name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unknown_entity_policy: UnknownEntityPolicy::default(),
        }
    }

    /// Sets the unknown entity policy.
    #[must_use]
    pub fn with_unknown_entity_policy(mut self, policy: UnknownEntityPolicy) -> Self {
        self.unknown_entity_policy = policy;
        self
    }

    /// Checks that the configuration can be used to build an adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyAdapterName`] if the name is empty or blank.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::EmptyAdapterName);
        }
        Ok(())
    }
}

impl From<&str> for AdapterConfig {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for AdapterConfig {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
