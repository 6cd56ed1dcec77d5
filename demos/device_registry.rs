// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device registry demo.
//!
//! Feeds an adapter from a hand-written source through a connector, then
//! from an [`EntityRegistry`] over the asynchronous event source.
//!
//! Run with `RUST_LOG=trace cargo run --example device_registry` to see
//! every step.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use data_consumer_adapter::adapter::{DataConsumerAdapter, Registrar};
use data_consumer_adapter::entity::{DeviceInfo, EntityRef};
use data_consumer_adapter::error::AdapterError;
use data_consumer_adapter::event::{AsyncEventSource, ChangeEvent, Notifier, Subscription};
use data_consumer_adapter::registry::EntityRegistry;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

/// Registrar that only remembers which devices it has seen.
#[derive(Default)]
struct ExampleAdapter {
    devices: BTreeSet<String>,
}

impl Registrar for ExampleAdapter {
    fn registrate(&mut self, entity: &EntityRef) -> Result<(), AdapterError> {
        if self.devices.insert(entity.id().to_string()) {
            tracing::info!("Device {} was registered", entity.name());
        } else {
            tracing::info!("Device {} was already registered, ignoring new instance", entity.name());
        }
        Ok(())
    }

    fn deregistrate(&mut self, id: &str) -> Result<(), AdapterError> {
        if self.devices.remove(id) {
            tracing::info!("Device {id} was deregistered");
            Ok(())
        } else {
            Err(AdapterError::failed(format!("Device {id} does not exist")))
        }
    }
}

/// Source that hands events to a single connected notifier.
#[derive(Clone, Default)]
struct FakeSource {
    connection: Arc<Mutex<Option<Notifier>>>,
}

impl FakeSource {
    fn connect(&self, notifier: Notifier) -> Subscription {
        *self.connection.lock() = Some(notifier);
        let connection = Arc::clone(&self.connection);
        Subscription::from_release(move || {
            connection.lock().take();
        })
    }

    fn notify(&self, event: &ChangeEvent) {
        if let Some(notifier) = self.connection.lock().as_ref() {
            notifier.notify(event);
        }
    }
}

fn mocked_device(id: &str) -> DeviceInfo {
    DeviceInfo::new(id, "Mocky").with_description("A mocked device with no elements")
}

fn with_connector() -> data_consumer_adapter::Result<()> {
    let source = FakeSource::default();
    let connector = source.clone();
    let adapter = DataConsumerAdapter::with_connector("Example DCAI", ExampleAdapter::default(), move |notifier| {
        connector.connect(notifier)
    })?;

    adapter.start_empty()?;

    source.notify(&ChangeEvent::upserted(mocked_device("1234")));
    source.notify(&ChangeEvent::removed("1234"));
    // Logged by the adapter, not returned to the source
    source.notify(&ChangeEvent::removed("1234"));

    adapter.stop()?;
    Ok(())
}

async fn with_registry() -> data_consumer_adapter::Result<()> {
    let source = AsyncEventSource::new(|error| tracing::error!(%error, "Listener failed"))?;
    let registry = EntityRegistry::with_publisher(source.clone());

    registry.upsert(mocked_device("1"));
    registry.upsert(DeviceInfo::with_generated_id("Generated"));

    let adapter = DataConsumerAdapter::new("Registry DCAI", ExampleAdapter::default(), registry.publisher())?;
    adapter.start(registry.snapshot())?;

    registry.upsert(mocked_device("2"));
    registry.remove("1");

    tokio::time::sleep(Duration::from_millis(200)).await;
    let seen = adapter.with_registrar(|example| example.devices.len());
    tracing::info!(devices = seen, "Registry DCAI is in sync");

    tokio::task::block_in_place(|| adapter.stop())?;
    source.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() -> data_consumer_adapter::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    with_connector()?;
    with_registry().await?;
    Ok(())
}
