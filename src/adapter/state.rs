// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter lifecycle states.

use std::fmt;

/// Lifecycle state of a [`DataConsumerAdapter`](super::DataConsumerAdapter).
///
/// The only valid path is `Created` → `Started` → `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AdapterState {
    /// Constructed and subscribed, not started yet.
    Created = 0,
    /// Started; snapshot initialization may still be running.
    Started = 1,
    /// Stopped. Terminal.
    Stopped = 2,
}

impl AdapterState {
    pub(crate) fn from_repr(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Started,
            _ => Self::Stopped,
        }
    }

    /// Returns `true` if incoming events are still applied in this state.
    #[must_use]
    pub fn accepts_events(self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "Created",
            Self::Started => "Started",
            Self::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}
