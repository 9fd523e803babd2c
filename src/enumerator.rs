//! The enumerator: owner of the device table and the hotplug thread.
//!
//! An [`Enumerator`] is an explicitly constructed value, normally shared as
//! `Arc<Enumerator>` between the [`DeviceService`](crate::service::DeviceService)s that
//! depend on it. [`Enumerator::start`] does one synchronous bus scan and then hands hotplug
//! detection to a background thread that runs until [`Enumerator::shutdown`] (or drop).
//!
//! # Locking
//! - One mutex guards the [`DeviceTable`]. Hotplug mutations, state drains and liveness
//!   transitions all take it; backend calls that can block (`open`, the hotplug wait) run
//!   outside it.
//! - Notifications are queued inside the table under that lock and delivered afterwards by
//!   whichever thread made the change. Delivery is serialized by a second mutex, so every
//!   subscriber sees changes in exactly the order the table recorded them. Subscribers may
//!   call back into the enumerator; such calls queue their changes and the delivery loop
//!   already running on that thread picks them up.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, trace, warn};

use crate::backends::{self, Backend, HotplugEvent, HotplugMonitor, Wake};
use crate::config::{Config, EnumeratorConfig};
use crate::device::{DeviceId, RawDevice};
use crate::error::{BackendError, EnumeratorError};
use crate::event::{DeviceStateChange, RawEvent};
use crate::eventbus::{self, DeviceEventBus, Listener, SubscriptionId};
use crate::snapshot::{DeviceInfo, Snapshot};
use crate::state::CachedState;
use crate::table::{Admission, DeviceTable, DrainLimits, Refresh};

thread_local! {
    /// Enumerators whose delivery loop is running on this thread.
    static DELIVERING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks this thread as delivering for one enumerator until dropped.
struct DeliveryGuard(usize);

impl DeliveryGuard {
    fn enter(key: usize) -> Self {
        DELIVERING.with(|d| d.borrow_mut().push(key));
        Self(key)
    }

    fn active(key: usize) -> bool {
        DELIVERING.with(|d| d.borrow().contains(&key))
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        DELIVERING.with(|d| {
            let mut active = d.borrow_mut();
            if let Some(pos) = active.iter().rposition(|&k| k == self.0) {
                active.remove(pos);
            }
        });
    }
}

struct Shared {
    backend: Box<dyn Backend>,
    config: EnumeratorConfig,
    table: Mutex<DeviceTable>,
    bus: Mutex<DeviceEventBus>,
    /// Held while notifications are being delivered.
    dispatch: Mutex<()>,
}

impl Shared {
    fn key(&self) -> usize {
        self as *const Shared as usize
    }

    fn table(&self) -> MutexGuard<'_, DeviceTable> {
        lock(&self.table)
    }

    fn limits(&self) -> DrainLimits {
        DrainLimits {
            max_events: self.config.max_events_per_drain.max(1),
            busy_retries: self.config.read_retries,
        }
    }

    /// Full bus scan. Per-device open failures are skipped.
    fn enumerate_all(&self) -> Result<usize, BackendError> {
        let found = self.backend.enumerate()?;
        debug!(backend = self.backend.name(), count = found.len(), "enumerating");
        let mut admitted = 0;
        for raw in found {
            if self.enumerate_one(raw) {
                admitted += 1;
            }
        }
        Ok(admitted)
    }

    /// Open `raw` and record it. Returns `true` if a record became alive.
    fn enumerate_one(&self, raw: RawDevice) -> bool {
        if let Some(id) = self.table().find_alive_duplicate(&raw) {
            trace!(%id, locator = %raw.locator, "already tracking");
            return false;
        }

        let mut handle = match self.backend.open(&raw) {
            Ok(handle) => handle,
            Err(e) => {
                debug!(locator = %raw.locator, error = %e, "skipping device that failed to open");
                return false;
            }
        };
        let mut seed: Vec<RawEvent> = Vec::new();
        handle.initial_state(&mut seed);

        let admission = self.table().admit(raw, handle, &seed);
        self.flush();
        !matches!(admission, Admission::Duplicate(_))
    }

    fn handle_hotplug(&self, event: HotplugEvent) {
        match event {
            HotplugEvent::Arrived(raw) => {
                self.enumerate_one(raw);
            }
            HotplugEvent::Departed { locator } => {
                {
                    let mut table = self.table();
                    for id in table.alive_at(&locator) {
                        table.confirm_loss(id);
                    }
                }
                self.flush();
            }
            HotplugEvent::Rescan => {
                if let Err(e) = self.enumerate_all() {
                    warn!(error = %e, "rescan failed");
                }
            }
            HotplugEvent::Listed(devices) => {
                let stale: Vec<RawDevice> = {
                    let table = self.table();
                    devices
                        .into_iter()
                        .filter(|raw| table.awaits_readmission(raw))
                        .collect()
                };
                for raw in stale {
                    debug!(locator = %raw.locator, "device listed again after loss");
                    self.enumerate_one(raw);
                }
            }
            HotplugEvent::ProbeAll => {
                {
                    let mut table = self.table();
                    let alive: Vec<DeviceId> = table.alive_ids().map(|(id, _)| id).collect();
                    for id in alive {
                        table.confirm_loss(id);
                    }
                }
                self.flush();
            }
        }
    }

    /// Deliver queued changes unless this thread is already delivering for us.
    fn flush(&self) {
        if DeliveryGuard::active(self.key()) {
            return;
        }
        let _turn = lock(&self.dispatch);
        let _guard = DeliveryGuard::enter(self.key());
        self.deliver_pending();
    }

    /// Caller holds the dispatch lock.
    fn deliver_pending(&self) {
        loop {
            let changes = self.table().take_pending();
            if changes.is_empty() {
                return;
            }
            let listeners = lock(&self.bus).snapshot();
            eventbus::emit_all(&listeners, &changes);
        }
    }

    fn refresh(&self, id: DeviceId) -> Refresh {
        let outcome = self.table().refresh(id, self.limits());
        if outcome == Refresh::Lost {
            self.flush();
        }
        outcome
    }
}

struct Worker {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

impl Worker {
    /// Signal the thread and join it.
    fn stop(self) {
        // Either the thread is waiting and takes this message, or it already exited.
        let _ = self.shutdown.send(());
        if self.thread.thread().id() == thread::current().id() {
            warn!("shutdown requested from the hotplug thread; not joining");
        } else if self.thread.join().is_err() {
            warn!("hotplug thread panicked");
        }
    }
}

enum Lifecycle {
    Idle,
    Starting,
    Running(Worker),
    ShutDown,
}

/// Owner of the device table and the hotplug thread.
pub struct Enumerator {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

impl Enumerator {
    pub fn new(backend: impl Backend + 'static, config: EnumeratorConfig) -> Self {
        Self::with_backend(Box::new(backend), config)
    }

    pub fn with_backend(backend: Box<dyn Backend>, config: EnumeratorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                config,
                table: Mutex::new(DeviceTable::new()),
                bus: Mutex::new(DeviceEventBus::new()),
                dispatch: Mutex::new(()),
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Enumerator over this platform's default backend.
    pub fn from_config(config: &Config) -> Self {
        let backend =
            backends::default_backend(&config.all_profiles(), config.enumerator.rescan_interval());
        Self::with_backend(backend, config.enumerator.clone())
    }

    /// Start hotplug detection.
    ///
    /// The first call sets up the backend's hotplug monitor, scans the bus synchronously and
    /// launches the hotplug thread. Later calls rescan the bus and return `Ok`.
    pub fn start(&self) -> Result<(), EnumeratorError> {
        {
            let mut lifecycle = lock(&self.lifecycle);
            match *lifecycle {
                Lifecycle::ShutDown => return Err(EnumeratorError::ShutDown),
                Lifecycle::Idle => *lifecycle = Lifecycle::Starting,
                Lifecycle::Starting | Lifecycle::Running(_) => {
                    drop(lifecycle);
                    if let Err(e) = self.rescan() {
                        warn!(error = %e, "rescan failed");
                    }
                    return Ok(());
                }
            }
        }

        match self.launch() {
            Ok(worker) => {
                let mut lifecycle = lock(&self.lifecycle);
                if matches!(*lifecycle, Lifecycle::ShutDown) {
                    drop(lifecycle);
                    worker.stop();
                    return Err(EnumeratorError::ShutDown);
                }
                *lifecycle = Lifecycle::Running(worker);
                Ok(())
            }
            Err(e) => {
                let mut lifecycle = lock(&self.lifecycle);
                if matches!(*lifecycle, Lifecycle::Starting) {
                    *lifecycle = Lifecycle::Idle;
                }
                Err(e)
            }
        }
    }

    fn launch(&self) -> Result<Worker, EnumeratorError> {
        let backend = self.shared.backend.name();
        let monitor = self.shared.backend.monitor().map_err(|e| {
            error!(backend, error = %e, "backend initialization failed");
            EnumeratorError::BackendUnavailable(e)
        })?;
        let admitted = self
            .shared
            .enumerate_all()
            .map_err(EnumeratorError::BackendUnavailable)?;

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let shared = Arc::clone(&self.shared);
        let thread = thread::Builder::new()
            .name("joylink-hotplug".into())
            .spawn(move || hotplug_loop(shared, monitor, shutdown_rx))
            .map_err(EnumeratorError::Spawn)?;

        info!(backend, devices = admitted, "enumerator started");
        Ok(Worker {
            shutdown: shutdown_tx,
            thread,
        })
    }

    pub fn is_running(&self) -> bool {
        matches!(*lock(&self.lifecycle), Lifecycle::Running(_))
    }

    /// One synchronous re-enumeration pass. Returns how many records became alive.
    pub fn rescan(&self) -> Result<usize, BackendError> {
        self.shared.enumerate_all()
    }

    /// Register `listener` and replay `Added` for every currently alive device to it.
    ///
    /// Changes already queued are delivered to the existing subscribers first, so the new
    /// subscriber starts from a consistent picture. Changes queued while the replay runs,
    /// including ones the new listener causes itself, are delivered to everyone before this
    /// returns.
    pub fn subscribe(
        &self,
        listener: impl Fn(&DeviceStateChange) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let listener: Arc<Listener> = Arc::new(listener);
        let shared = &self.shared;

        let nested = DeliveryGuard::active(shared.key());
        let _turn = if nested {
            None
        } else {
            Some(lock(&shared.dispatch))
        };
        let _guard = DeliveryGuard::enter(shared.key());

        // The queued changes and the alive set must come from the same table state, or a
        // change queued in between would reach the new listener twice.
        let (queued, replay) = {
            let mut table = shared.table();
            let queued = if nested {
                Vec::new()
            } else {
                table.take_pending()
            };
            let replay: Vec<DeviceStateChange> = table
                .alive_ids()
                .map(|(id, descriptor)| DeviceStateChange::added(id, descriptor))
                .collect();
            (queued, replay)
        };
        if !queued.is_empty() {
            let existing = lock(&shared.bus).snapshot();
            eventbus::emit_all(&existing, &queued);
        }

        let id = lock(&shared.bus).add_listener(Arc::clone(&listener));
        trace!(subscription = ?id, replayed = replay.len(), "subscriber registered");
        for change in &replay {
            listener(change);
        }
        if !nested {
            shared.deliver_pending();
        }
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock(&self.shared.bus).remove_listener(id)
    }

    /// Number of alive records.
    pub fn connected_count(&self) -> usize {
        self.shared.table().connected()
    }

    /// Drain pending input for `id` and return its cached state.
    ///
    /// `None` if `id` is unknown or not alive. If the drain finds the device gone, the record
    /// goes dormant, `Removed` is delivered before this returns, and the result is an empty
    /// state.
    pub fn raw_state(&self, id: DeviceId) -> Option<CachedState> {
        match self.shared.refresh(id) {
            Refresh::Live(state) => Some(state),
            Refresh::Lost => Some(CachedState::default()),
            Refresh::NotAlive => None,
        }
    }

    pub fn device_info(&self, id: DeviceId) -> Option<DeviceInfo> {
        self.shared.table().get(id).map(DeviceInfo::from_record)
    }

    /// Every record, alive or dormant, in id order.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.shared.table().records().map(DeviceInfo::from_record).collect()
    }

    /// Drain every alive device and collect its info and state.
    pub fn snapshot(&self) -> Snapshot {
        let alive: Vec<DeviceId> = self.shared.table().alive_ids().map(|(id, _)| id).collect();
        let mut snapshot = Snapshot::default();
        for id in alive {
            if let Refresh::Live(state) = self.shared.refresh(id) {
                if let Some(info) = self.device_info(id) {
                    snapshot.insert(info, state);
                }
            }
        }
        snapshot
    }

    /// Stop the hotplug thread, join it, and close every open handle.
    ///
    /// Idempotent. Ids handed out before shutdown stay invalid afterwards.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *lock(&self.lifecycle), Lifecycle::ShutDown);
        if let Lifecycle::Running(worker) = previous {
            worker.stop();
            info!("enumerator shut down");
        }
        self.shared.table().clear();
    }
}

impl Drop for Enumerator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn hotplug_loop(shared: Arc<Shared>, mut monitor: Box<dyn HotplugMonitor>, shutdown: Receiver<()>) {
    debug!("hotplug thread running");
    loop {
        match monitor.wait(&shutdown) {
            Ok(Wake::Shutdown) => break,
            Ok(Wake::Events(events)) => {
                for event in events {
                    trace!(?event, "hotplug");
                    let handled =
                        panic::catch_unwind(AssertUnwindSafe(|| shared.handle_hotplug(event)));
                    if handled.is_err() {
                        error!("subscriber panicked while handling a hotplug event");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "ignoring hotplug monitor error");
                match shutdown.recv_timeout(shared.config.error_backoff()) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }
    }
    debug!("hotplug thread stopped");
}
