// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the data consumer adapter library.
//!
//! Errors are split by where they originate:
//!
//! - [`Error`] is returned to callers of the public API (construction and
//!   lifecycle misuse).
//! - [`AdapterError`] is returned by [`Registrar`](crate::adapter::Registrar)
//!   implementations. The adapter machinery catches and logs it; it never
//!   reaches the event bus.
//! - [`ListenerError`] is returned by an
//!   [`EventListener`](crate::event::EventListener). The bus isolates it per
//!   listener.

use std::any::Any;

use thiserror::Error;

use crate::adapter::AdapterState;

/// Result type alias using the library's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// An adapter was constructed with an empty name.
    #[error("adapter name must not be empty")]
    EmptyAdapterName,

    /// A lifecycle operation was called out of sequence.
    #[error("cannot {operation} adapter in state {state}")]
    InvalidState {
        /// The rejected operation (`start` or `stop`).
        operation: &'static str,
        /// The state the adapter was in.
        state: AdapterState,
    },

    /// No tokio runtime was available to drive asynchronous dispatch.
    #[error("no tokio runtime available for asynchronous dispatch")]
    NoRuntime,

    /// The bulk initialization worker could not be spawned.
    #[error("failed to spawn bulk initialization worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors raised by registration extension points.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// `deregistrate` was called for an identifier that is not tracked.
    #[error("entity {id} is not registered")]
    UnknownEntity {
        /// The unknown entity identifier.
        id: String,
    },

    /// A registration operation was invoked without being implemented.
    #[error("{operation} is not implemented")]
    Unimplemented {
        /// Name of the missing operation.
        operation: &'static str,
    },

    /// The adapter panicked while handling an entity.
    #[error("adapter panicked: {0}")]
    Panicked(String),

    /// Any other failure reported by the adapter.
    #[error("{0}")]
    Failed(String),
}

impl AdapterError {
    /// Creates an unknown entity error.
    #[must_use]
    pub fn unknown_entity(id: impl Into<String>) -> Self {
        Self::UnknownEntity { id: id.into() }
    }

    /// Creates a generic failure with the given message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Returns `true` if this is an [`AdapterError::UnknownEntity`].
    #[must_use]
    pub fn is_unknown_entity(&self) -> bool {
        matches!(self, Self::UnknownEntity { .. })
    }
}

/// Errors raised by a listener while an event is delivered to it.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listener rejected the event.
    #[error("listener rejected event: {0}")]
    Rejected(String),

    /// The listener panicked during delivery.
    #[error("listener panicked: {0}")]
    Panicked(String),
}

impl ListenerError {
    /// Creates a rejection with the given message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Converts a panic payload into a listener error.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::Panicked(panic_message(payload))
    }
}

/// Extracts the message of a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
