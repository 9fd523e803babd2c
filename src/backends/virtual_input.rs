//! In-process virtual controllers.
//!
//! [`VirtualBackend`] simulates a bus that tests and demos drive by hand: attach and detach
//! controllers, feed input events, and script read failures. Hotplug notifications are
//! delivered over a channel to the monitor, exactly like a real backend's would be.
//!
//! ```
//! use joylink::backends::virtual_input::VirtualBackend;
//! use joylink::device::DeviceDescriptor;
//!
//! let backend = VirtualBackend::new();
//! let stick = backend.attach(DeviceDescriptor::new(0x046d, 0xc215), "stick-1");
//! stick.set_axis(0, 512);
//! stick.press_button(0x120);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Receiver, Sender};

use crate::backends::{Backend, HotplugEvent, HotplugMonitor, Wake};
use crate::device::{
    Device, DeviceDescriptor, DeviceHandle, DeviceIdentity, Presence, RawDevice, ReadError,
};
use crate::error::BackendError;
use crate::event::{HatInput, RawEvent};
use crate::metadata::DeviceMeta;

struct Slot {
    raw: RawDevice,
    plugged: bool,
    /// Bumped on every attach; handles from an earlier attachment read as gone.
    generation: u64,
    queue: VecDeque<RawEvent>,
    failures: VecDeque<ReadError>,
    probe_override: Option<Presence>,
}

#[derive(Default)]
struct Bus {
    slots: Vec<Slot>,
    watchers: Vec<Sender<HotplugEvent>>,
    unavailable: bool,
    open_failures: usize,
    wait_failures: usize,
}

impl Bus {
    fn notify(&mut self, event: HotplugEvent) {
        self.watchers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[derive(Clone, Default)]
struct SharedBus(Arc<Mutex<Bus>>);

impl SharedBus {
    fn lock(&self) -> MutexGuard<'_, Bus> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A simulated controller bus.
///
/// Cloning is cheap; clones drive the same bus.
#[derive(Clone, Default)]
pub struct VirtualBackend {
    bus: SharedBus,
}

impl VirtualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plug in a new controller and announce it.
    pub fn attach(&self, descriptor: DeviceDescriptor, identity: &str) -> VirtualController {
        self.attach_with(descriptor, identity, DeviceMeta::default())
    }

    pub fn attach_with(
        &self,
        descriptor: DeviceDescriptor,
        identity: &str,
        meta: DeviceMeta,
    ) -> VirtualController {
        let mut bus = self.bus.lock();
        let slot = bus.slots.len();
        let raw = RawDevice {
            descriptor,
            identity: DeviceIdentity::new(identity),
            locator: format!("virtual:{slot}"),
            meta,
        };
        bus.slots.push(Slot {
            raw: raw.clone(),
            plugged: true,
            generation: 0,
            queue: VecDeque::new(),
            failures: VecDeque::new(),
            probe_override: None,
        });
        bus.notify(HotplugEvent::Arrived(raw));
        VirtualController {
            bus: self.bus.clone(),
            slot,
        }
    }

    /// Make the next [`Backend::monitor`] call fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.bus.lock().unavailable = unavailable;
    }

    /// Make the next `count` [`Backend::open`] calls fail.
    pub fn fail_next_opens(&self, count: usize) {
        self.bus.lock().open_failures = count;
    }

    /// Make the next `count` [`HotplugMonitor::wait`] calls fail, whichever monitor makes them.
    pub fn fail_next_waits(&self, count: usize) {
        self.bus.lock().wait_failures = count;
    }

    /// Push an arbitrary event to every monitor.
    pub fn announce(&self, event: HotplugEvent) {
        self.bus.lock().notify(event);
    }

    pub fn attached(&self) -> usize {
        self.bus.lock().slots.iter().filter(|s| s.plugged).count()
    }
}

impl Backend for VirtualBackend {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn monitor(&self) -> Result<Box<dyn HotplugMonitor>, BackendError> {
        let mut bus = self.bus.lock();
        if bus.unavailable {
            return Err(BackendError::Unavailable("virtual bus disabled".into()));
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        bus.watchers.push(tx);
        Ok(Box::new(VirtualMonitor {
            bus: self.bus.clone(),
            events: rx,
        }))
    }

    fn enumerate(&self) -> Result<Vec<RawDevice>, BackendError> {
        Ok(self
            .bus
            .lock()
            .slots
            .iter()
            .filter(|s| s.plugged)
            .map(|s| s.raw.clone())
            .collect())
    }

    fn open(&self, device: &RawDevice) -> Result<DeviceHandle, BackendError> {
        let mut bus = self.bus.lock();
        if bus.open_failures > 0 {
            bus.open_failures -= 1;
            return Err(BackendError::Open {
                locator: device.locator.clone(),
                reason: "scripted open failure".into(),
            });
        }
        let found = bus
            .slots
            .iter()
            .enumerate()
            .find(|(_, s)| s.plugged && s.raw.locator == device.locator)
            .map(|(index, s)| (index, s.generation));
        match found {
            Some((slot, generation)) => Ok(Box::new(VirtualHandle {
                bus: self.bus.clone(),
                slot,
                generation,
            })),
            None => Err(BackendError::Open {
                locator: device.locator.clone(),
                reason: "not attached".into(),
            }),
        }
    }
}

struct VirtualMonitor {
    bus: SharedBus,
    events: Receiver<HotplugEvent>,
}

impl HotplugMonitor for VirtualMonitor {
    fn wait(&mut self, shutdown: &Receiver<()>) -> Result<Wake, BackendError> {
        {
            let mut bus = self.bus.lock();
            if bus.wait_failures > 0 {
                bus.wait_failures -= 1;
                return Err(BackendError::Malformed("scripted monitor failure".into()));
            }
        }
        crossbeam_channel::select! {
            recv(shutdown) -> _ => Ok(Wake::Shutdown),
            recv(self.events) -> first => match first {
                Ok(first) => {
                    let mut events = vec![first];
                    events.extend(self.events.try_iter());
                    Ok(Wake::Events(events))
                }
                Err(_) => Err(BackendError::Malformed("virtual bus went away".into())),
            },
        }
    }
}

/// Test-side handle to one simulated controller.
#[derive(Clone)]
pub struct VirtualController {
    bus: SharedBus,
    slot: usize,
}

impl VirtualController {
    fn with_slot<R>(&self, f: impl FnOnce(&mut Slot) -> R) -> R {
        f(&mut self.bus.lock().slots[self.slot])
    }

    /// Inject a raw input event. Ignored while detached.
    pub fn feed(&self, event: RawEvent) {
        self.with_slot(|slot| {
            if slot.plugged {
                slot.queue.push_back(event);
            }
        });
    }

    pub fn set_axis(&self, code: u16, value: i32) {
        self.feed(RawEvent::Axis { code, value });
    }

    pub fn press_button(&self, code: u16) {
        self.feed(RawEvent::Button {
            code,
            pressed: true,
        });
    }

    pub fn release_button(&self, code: u16) {
        self.feed(RawEvent::Button {
            code,
            pressed: false,
        });
    }

    pub fn set_hat(&self, hat: HatInput) {
        self.feed(RawEvent::Hat(hat));
    }

    /// The next `count` reads fail with `error`.
    pub fn fail_reads(&self, error: ReadError, count: usize) {
        self.with_slot(|slot| slot.failures.extend(std::iter::repeat(error).take(count)));
    }

    /// Force what [`Device::probe`] reports; `None` restores the default.
    pub fn override_probe(&self, presence: Option<Presence>) {
        self.with_slot(|slot| slot.probe_override = presence);
    }

    /// Unplug and announce the departure.
    pub fn detach(&self) {
        let mut bus = self.bus.lock();
        let slot = &mut bus.slots[self.slot];
        if !slot.plugged {
            return;
        }
        slot.plugged = false;
        slot.queue.clear();
        let locator = slot.raw.locator.clone();
        bus.notify(HotplugEvent::Departed { locator });
    }

    /// Unplug without any notification; only a read or probe notices.
    pub fn detach_silently(&self) {
        self.with_slot(|slot| {
            slot.plugged = false;
            slot.queue.clear();
        });
    }

    /// Plug the same physical unit back in and announce it.
    pub fn reattach(&self) {
        let mut bus = self.bus.lock();
        let slot = &mut bus.slots[self.slot];
        if slot.plugged {
            return;
        }
        slot.plugged = true;
        slot.generation += 1;
        slot.failures.clear();
        let raw = slot.raw.clone();
        bus.notify(HotplugEvent::Arrived(raw));
    }

    pub fn locator(&self) -> String {
        self.with_slot(|slot| slot.raw.locator.clone())
    }

    pub fn is_attached(&self) -> bool {
        self.with_slot(|slot| slot.plugged)
    }
}

struct VirtualHandle {
    bus: SharedBus,
    slot: usize,
    generation: u64,
}

impl VirtualHandle {
    fn current(&self, slot: &Slot) -> bool {
        slot.plugged && slot.generation == self.generation
    }
}

impl Device for VirtualHandle {
    fn read_pending(&mut self, out: &mut Vec<RawEvent>, max_events: usize) -> Result<(), ReadError> {
        let mut bus = self.bus.lock();
        let slot = &mut bus.slots[self.slot];
        if !self.current(slot) {
            return Err(ReadError::Gone);
        }
        if let Some(error) = slot.failures.pop_front() {
            return Err(error);
        }
        let take = slot.queue.len().min(max_events);
        out.extend(slot.queue.drain(..take));
        Ok(())
    }

    fn probe(&mut self) -> Presence {
        let bus = self.bus.lock();
        let slot = &bus.slots[self.slot];
        if let Some(presence) = slot.probe_override {
            return presence;
        }
        if self.current(slot) {
            Presence::Present
        } else {
            Presence::Gone
        }
    }
}
