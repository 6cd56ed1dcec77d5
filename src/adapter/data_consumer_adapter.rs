// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data consumer adapter state machine.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::entity::EntityRef;
use crate::error::{AdapterError, Error, ListenerError, Result, panic_message};
use crate::event::{ChangeEvent, EventListener, EventPublisher, Notifier, Subscription};

use super::{AdapterConfig, AdapterState, Registrar, UnknownEntityPolicy};

/// Consumer that keeps a [`Registrar`] in sync with the entity registry.
///
/// The adapter subscribes to an event source at construction and turns
/// every [`ChangeEvent`] into a `registrate` or `deregistrate` call on its
/// registrar. All of these calls, including the snapshot burst started by
/// [`start`](Self::start), are serialized by a single registration lock:
///
/// - at most one registration-affecting operation runs at a time;
/// - events arriving while a snapshot is applied wait for the whole burst,
///   then run in arrival order. None are dropped.
///
/// Registrar errors are logged with the adapter name, entity id and error
/// text, and are never propagated to the event source.
///
/// # Lifecycle
///
/// `Created` → [`start`](Self::start) → `Started` → [`stop`](Self::stop) →
/// `Stopped`. Any other transition fails with [`Error::InvalidState`].
/// Events are applied in `Created` and `Started`. Events admitted before
/// [`stop`](Self::stop), including those still waiting behind the snapshot
/// burst, are applied before `stop` returns. `stop` releases the
/// subscription and any event that reaches the adapter afterwards is
/// ignored.
///
/// Dropping a started adapter stops it. Both `stop` and the drop block the
/// calling thread until pending work has drained, so inside a tokio runtime
/// call them from a blocking context (`spawn_blocking` or `block_in_place`).
///
/// # Examples
///
/// ```
/// use data_consumer_adapter::adapter::{DataConsumerAdapter, EntityCatalog};
/// use data_consumer_adapter::entity::DeviceInfo;
/// use data_consumer_adapter::event::{ChangeEvent, EventSource};
///
/// # fn main() -> data_consumer_adapter::Result<()> {
/// let source = EventSource::new();
/// let adapter = DataConsumerAdapter::new("Dashboard", EntityCatalog::new(), &source)?;
///
/// adapter.start(vec![DeviceInfo::new("1", "Lamp").into_ref()])?;
/// source.notify(&ChangeEvent::upserted(DeviceInfo::new("2", "Fan")));
/// adapter.stop()?;
///
/// assert_eq!(adapter.with_registrar(|catalog| catalog.ids()), vec!["1", "2"]);
/// # Ok(())
/// # }
/// ```
pub struct DataConsumerAdapter<R: Registrar> {
    core: Arc<AdapterCore<R>>,
    connection: Mutex<Option<Subscription>>,
    bulk_worker: Mutex<Option<JoinHandle<()>>>,
}

/// State shared between the adapter, its event subscription and the
/// snapshot worker.
struct AdapterCore<R> {
    name: String,
    unknown_entity_policy: UnknownEntityPolicy,
    state: AtomicU8,
    registration: Arc<Mutex<R>>,
    in_flight: InFlight,
}

/// Count of events admitted by `handle_event` and not yet applied.
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    drained: Condvar,
}

impl InFlight {
    /// Registers one event if `admit` allows it.
    ///
    /// `admit` runs under the counter lock, so a caller that sees the
    /// counter at zero after changing the state cannot miss an admission.
    fn enter(&self, admit: impl FnOnce() -> bool) -> Option<InFlightGuard<'_>> {
        let mut count = self.count.lock();
        if !admit() {
            return None;
        }
        *count += 1;
        Some(InFlightGuard(self))
    }

    /// Blocks until every admitted event has been applied.
    fn wait_drained(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.drained.wait(&mut count);
        }
    }
}

struct InFlightGuard<'a>(&'a InFlight);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut count = self.0.count.lock();
        *count -= 1;
        if *count == 0 {
            self.0.drained.notify_all();
        }
    }
}

impl<R: Registrar> DataConsumerAdapter<R> {
    /// Creates an adapter subscribed to `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyAdapterName`] if the configured name is empty.
    pub fn new<P>(config: impl Into<AdapterConfig>, registrar: R, source: &P) -> Result<Self>
    where
        P: EventPublisher + ?Sized,
    {
        let adapter = Self::build(config.into(), registrar)?;
        let subscription = source.subscribe_weak(adapter.listener());
        *adapter.connection.lock() = Some(subscription);
        Ok(adapter)
    }

    /// Creates an adapter connected through a custom connector.
    ///
    /// `connector` is called once with a [`Notifier`] reaching this adapter.
    /// The returned subscription is held until [`stop`](Self::stop) or drop;
    /// releasing it must end the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyAdapterName`] if the configured name is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use parking_lot::{Condvar, Mutex};
    /// use data_consumer_adapter::adapter::{DataConsumerAdapter, EntityCatalog};
    /// use data_consumer_adapter::entity::DeviceInfo;
    /// use data_consumer_adapter::event::{ChangeEvent, Notifier, Subscription};
    ///
    /// # fn main() -> data_consumer_adapter::Result<()> {
    /// let notifiers: Arc<Mutex<Vec<Notifier>>> = Arc::default();
    ///
    /// let registered = Arc::clone(&notifiers);
    /// let adapter = DataConsumerAdapter::with_connector("Custom", EntityCatalog::new(), move |notifier| {
    ///     registered.lock().push(notifier);
    ///     Subscription::from_release(move || registered.lock().clear())
    /// })?;
    ///
    /// for notifier in notifiers.lock().iter() {
    ///     notifier.notify(&ChangeEvent::upserted(DeviceInfo::new("1", "Lamp")));
    /// }
    /// assert!(adapter.with_registrar(|catalog| catalog.contains("1")));
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_connector<C>(config: impl Into<AdapterConfig>, registrar: R, connector: C) -> Result<Self>
    where
        C: FnOnce(Notifier) -> Subscription,
    {
        let adapter = Self::build(config.into(), registrar)?;
        let subscription = connector(Notifier::new(adapter.listener()));
        *adapter.connection.lock() = Some(subscription);
        Ok(adapter)
    }

    fn build(config: AdapterConfig, registrar: R) -> Result<Self> {
        config.validate()?;
        tracing::trace!(adapter = %config.name, "DataConsumerAdapter created");

        Ok(Self {
            core: Arc::new(AdapterCore {
                name: config.name,
                unknown_entity_policy: config.unknown_entity_policy,
                state: AtomicU8::new(AdapterState::Created as u8),
                registration: Arc::new(Mutex::new(registrar)),
                in_flight: InFlight::default(),
            }),
            connection: Mutex::new(None),
            bulk_worker: Mutex::new(None),
        })
    }

    fn listener(&self) -> Weak<dyn EventListener> {
        let core: Weak<AdapterCore<R>> = Arc::downgrade(&self.core);
        core
    }

    /// Returns the adapter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AdapterState {
        self.core.state()
    }

    /// Returns `true` while the adapter holds its event subscription.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Starts the adapter with an empty snapshot.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start).
    pub fn start_empty(&self) -> Result<()> {
        self.start(Vec::new())
    }

    /// Starts the adapter and applies `snapshot` in the background.
    ///
    /// The registration lock is taken before this method returns and is
    /// held by a worker thread until `registrate` has been called for every
    /// entity of the snapshot, in order. Events that arrive meanwhile wait
    /// for the whole burst. This method does not wait for the burst; use
    /// [`stop`](Self::stop) to wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the adapter is not in
    /// [`AdapterState::Created`], or [`Error::Spawn`] if the worker thread
    /// could not be created (the adapter then stays in `Created`).
    pub fn start(&self, snapshot: Vec<EntityRef>) -> Result<()> {
        self.core
            .transition(AdapterState::Created, AdapterState::Started, "start")?;
        tracing::trace!(adapter = %self.core.name, snapshot = snapshot.len(), "Starting");

        let registration = self.core.registration.lock_arc();
        let core = Arc::clone(&self.core);
        let worker = thread::Builder::new()
            .name(format!("{}-init", self.core.name))
            .spawn(move || {
                let mut registrar = registration;
                core.initialise(&mut registrar, &snapshot);
            });

        match worker {
            Ok(handle) => {
                *self.bulk_worker.lock() = Some(handle);
                tracing::trace!(adapter = %self.core.name, "Started");
                Ok(())
            }
            Err(e) => {
                self.core
                    .state
                    .store(AdapterState::Created as u8, Ordering::Release);
                Err(Error::Spawn(e))
            }
        }
    }

    /// Stops the adapter.
    ///
    /// Releases the event subscription, then blocks until the snapshot
    /// burst and every event admitted before the call have been applied.
    /// Nothing is interrupted or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the adapter is not in
    /// [`AdapterState::Started`].
    pub fn stop(&self) -> Result<()> {
        self.core
            .transition(AdapterState::Started, AdapterState::Stopped, "stop")?;
        tracing::trace!(adapter = %self.core.name, "Received a stop command");

        if let Some(subscription) = self.connection.lock().take() {
            subscription.cancel();
        }

        let worker = self.bulk_worker.lock().take();
        if let Some(worker) = worker
            && worker.join().is_err()
        {
            tracing::error!(adapter = %self.core.name, "Snapshot worker terminated abnormally");
        }

        self.core.in_flight.wait_drained();

        tracing::trace!(adapter = %self.core.name, "Stopped");
        Ok(())
    }

    /// Runs `f` with shared access to the registrar.
    ///
    /// Blocks while a registration operation or snapshot burst is running.
    pub fn with_registrar<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(&self.core.registration.lock())
    }
}

impl<R: Registrar> Drop for DataConsumerAdapter<R> {
    fn drop(&mut self) {
        if self.state() == AdapterState::Started {
            tracing::debug!(adapter = %self.core.name, "Adapter dropped while started, stopping");
            let _ = self.stop();
        }
    }
}

impl<R: Registrar> fmt::Debug for DataConsumerAdapter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataConsumerAdapter")
            .field("name", &self.core.name)
            .field("state", &self.state())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl<R: Registrar> AdapterCore<R> {
    fn state(&self) -> AdapterState {
        AdapterState::from_repr(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: AdapterState, to: AdapterState, operation: &'static str) -> Result<()> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|current| Error::InvalidState {
                operation,
                state: AdapterState::from_repr(current),
            })
    }

    /// Applies a snapshot. The caller holds the registration lock.
    fn initialise(&self, registrar: &mut R, snapshot: &[EntityRef]) {
        tracing::trace!(adapter = %self.name, count = snapshot.len(), "Initialising model");
        for entity in snapshot {
            self.registrate(registrar, entity);
        }
        tracing::trace!(adapter = %self.name, "Model initialised");
    }

    fn registrate(&self, registrar: &mut R, entity: &EntityRef) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| registrar.registrate(entity)))
            .unwrap_or_else(|payload| Err(AdapterError::Panicked(panic_message(payload.as_ref()))));

        if let Err(error) = outcome {
            self.report("registrating", entity.id(), &error);
        }
    }

    fn deregistrate(&self, registrar: &mut R, id: &str) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| registrar.deregistrate(id)))
            .unwrap_or_else(|payload| Err(AdapterError::Panicked(panic_message(payload.as_ref()))));

        if let Err(error) = outcome {
            self.report("deregistrating", id, &error);
        }
    }

    fn report(&self, operation: &str, entity_id: &str, error: &AdapterError) {
        if error.is_unknown_entity() && self.unknown_entity_policy == UnknownEntityPolicy::Ignore {
            tracing::debug!(
                adapter = %self.name,
                entity_id = %entity_id,
                error = %error,
                "Ignoring unknown entity"
            );
            return;
        }

        tracing::error!(
            adapter = %self.name,
            entity_id = %entity_id,
            error = %error,
            "{} adapter encountered an unhandled error while {} entity {}: {}",
            self.name,
            operation,
            entity_id,
            error
        );
    }
}

impl<R: Registrar> EventListener for AdapterCore<R> {
    fn handle_event(&self, event: &ChangeEvent) -> std::result::Result<(), ListenerError> {
        let Some(_admitted) = self.in_flight.enter(|| self.state().accepts_events()) else {
            tracing::trace!(adapter = %self.name, entity_id = %event.entity_id(), "Adapter stopped, ignoring event");
            return Ok(());
        };

        // Admitted events are applied even if stop() starts meanwhile;
        // stop() waits for them.
        let mut registrar = self.registration.lock();
        match event {
            ChangeEvent::Upserted(entity) => self.registrate(&mut registrar, entity),
            ChangeEvent::Removed(id) => self.deregistrate(&mut registrar, id),
        }
        Ok(())
    }
}
