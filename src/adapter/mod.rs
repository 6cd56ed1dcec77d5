// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data consumer adapters.
//!
//! A [`DataConsumerAdapter`] is the bridge between the entity registry and a
//! consumer that keeps its own per-entity resources (a dashboard, a
//! persistence layer, a protocol exporter). It listens for
//! [`ChangeEvent`](crate::event::ChangeEvent)s and forwards them to a
//! [`Registrar`], the consumer-specific part:
//!
//! - [`Registrar::registrate`] is called for every added or updated entity,
//!   first for the snapshot given to [`DataConsumerAdapter::start`], then
//!   for every upsert event;
//! - [`Registrar::deregistrate`] is called for every removal event.
//!
//! The adapter serializes all of these calls, so a registrar never sees two
//! of them at once, and a removal can never overtake the snapshot burst.
//!
//! # Examples
//!
//! ```
//! use data_consumer_adapter::adapter::{DataConsumerAdapter, Registrar};
//! use data_consumer_adapter::entity::{DeviceInfo, Entity, EntityRef};
//! use data_consumer_adapter::error::AdapterError;
//! use data_consumer_adapter::event::{ChangeEvent, EventSource};
//!
//! #[derive(Default)]
//! struct Names(Vec<String>);
//!
//! impl Registrar for Names {
//!     fn registrate(&mut self, entity: &EntityRef) -> Result<(), AdapterError> {
//!         self.0.push(entity.name().to_string());
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> data_consumer_adapter::Result<()> {
//! let source = EventSource::new();
//! let adapter = DataConsumerAdapter::new("Names", Names::default(), &source)?;
//! adapter.start_empty()?;
//!
//! source.notify(&ChangeEvent::upserted(DeviceInfo::new("1", "Kitchen")));
//! // `deregistrate` is not implemented: the failure is logged and ignored
//! source.notify(&ChangeEvent::removed("1"));
//!
//! adapter.stop()?;
//! assert_eq!(adapter.with_registrar(|names| names.0.clone()), vec!["Kitchen"]);
//! # Ok(())
//! # }
//! ```

mod catalog;
mod config;
mod data_consumer_adapter;
mod registrar;
mod state;

pub use catalog::EntityCatalog;
pub use config::{AdapterConfig, UnknownEntityPolicy};
pub use data_consumer_adapter::DataConsumerAdapter;
pub use registrar::Registrar;
pub use state::AdapterState;
