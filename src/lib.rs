// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data Consumer Adapter - keeps consumers in sync with an entity registry.
//!
//! This library provides the change-notification core used to mirror a
//! registry of entities (devices, sensors, services) into any number of
//! consumers, each of which keeps its own per-entity state.
//!
//! # Components
//!
//! - **Events**: [`ChangeEvent`] with synchronous ([`EventSource`]) and
//!   non-blocking ([`AsyncEventSource`]) delivery to weakly held listeners
//! - **Adapters**: [`DataConsumerAdapter`] turns events into `registrate` /
//!   `deregistrate` calls on a [`Registrar`], serialized by one lock
//! - **Registry**: [`EntityRegistry`] publishes a change for every upsert
//!   and removal and provides start-up snapshots
//!
//! # Quick Start
//!
//! ```
//! use data_consumer_adapter::{DataConsumerAdapter, EntityCatalog, EntityRegistry};
//! use data_consumer_adapter::entity::DeviceInfo;
//!
//! fn main() -> data_consumer_adapter::Result<()> {
//!     let registry = EntityRegistry::new();
//!     registry.upsert(DeviceInfo::new("kitchen-1", "Kitchen light"));
//!
//!     // Subscribe, then start with the current content
//!     let adapter = DataConsumerAdapter::new("Dashboard", EntityCatalog::new(), registry.publisher())?;
//!     adapter.start(registry.snapshot())?;
//!
//!     // Later changes reach the adapter as events
//!     registry.upsert(DeviceInfo::new("hall-1", "Hall light"));
//!     registry.remove("kitchen-1");
//!
//!     adapter.stop()?;
//!     assert_eq!(adapter.with_registrar(|catalog| catalog.ids()), vec!["hall-1"]);
//!     Ok(())
//! }
//! ```
//!
//! ## Non-blocking delivery
//!
//! ```
//! use data_consumer_adapter::{AsyncEventSource, DataConsumerAdapter, EntityCatalog};
//! use data_consumer_adapter::event::ChangeEvent;
//! use data_consumer_adapter::entity::DeviceInfo;
//!
//! #[tokio::main]
//! async fn main() -> data_consumer_adapter::Result<()> {
//!     let source = AsyncEventSource::new(|error| eprintln!("listener failed: {error}"))?;
//!     let adapter = DataConsumerAdapter::new("Exporter", EntityCatalog::new(), &source)?;
//!     adapter.start_empty()?;
//!
//!     // Returns immediately; delivery happens on the runtime
//!     source.notify(&ChangeEvent::upserted(DeviceInfo::new("1", "Lamp")));
//!
//!     // stop() blocks until delivered events are applied
//!     tokio::task::block_in_place(|| adapter.stop())?;
//!     source.shutdown();
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod entity;
pub mod error;
pub mod event;
pub mod registry;

pub use adapter::{
    AdapterConfig, AdapterState, DataConsumerAdapter, EntityCatalog, Registrar, UnknownEntityPolicy,
};
pub use entity::{DeviceInfo, Entity, EntityRef};
pub use error::{AdapterError, Error, ListenerError, Result};
pub use event::{
    AsyncEventSource, ChangeEvent, EventListener, EventPublisher, EventSource, Notifier, Subscription,
    SubscriptionId,
};
pub use registry::EntityRegistry;
