// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for registry changes.
//!
//! This module provides the in-process pub/sub mechanism that keeps
//! consumers in sync with the entity registry:
//!
//! - [`ChangeEvent`] - a registry change (entity removed, or added/updated)
//! - [`EventListener`] - anything that can receive change events
//! - [`EventSource`] - delivers on the publisher's thread
//! - [`AsyncEventSource`] - delivers on a tokio runtime without blocking the publisher
//! - [`Subscription`] - handle whose release ends a subscription
//!
//! Both sources hold listeners weakly and isolate listener failures, so one
//! faulty consumer never affects the others or the publisher.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use data_consumer_adapter::entity::{DeviceInfo, Entity};
//! use data_consumer_adapter::error::ListenerError;
//! use data_consumer_adapter::event::{ChangeEvent, EventSource};
//!
//! let source = EventSource::new();
//!
//! let listener = Arc::new(|event: &ChangeEvent| -> Result<(), ListenerError> {
//!     match event {
//!         ChangeEvent::Upserted(entity) => println!("{} is available", entity.name()),
//!         ChangeEvent::Removed(id) => println!("{id} is gone"),
//!     }
//!     Ok(())
//! });
//! let subscription = source.subscribe(&listener);
//!
//! source.notify(&ChangeEvent::upserted(DeviceInfo::new("lamp-1", "Desk lamp")));
//! source.notify(&ChangeEvent::removed("lamp-1"));
//!
//! // Releasing the handle unsubscribes
//! drop(subscription);
//! assert_eq!(source.listener_count(), 0);
//! ```

mod async_event_source;
mod change_event;
mod event_source;
mod listener;
mod listener_set;
mod publisher;
mod subscription;

pub use async_event_source::{AsyncEventSource, ErrorHandler};
pub use change_event::ChangeEvent;
pub use event_source::EventSource;
pub use listener::{EventListener, Notifier};
pub use publisher::EventPublisher;
pub use subscription::{Subscription, SubscriptionId};
