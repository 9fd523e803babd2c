//! Platform backends.
//!
//! A [`Backend`] knows how to list attached controllers, open them as
//! [`Device`](crate::device::Device) handles, and produce a [`HotplugMonitor`] that the
//! enumerator's background thread blocks on.
//!
//! # Feature flags
//! - **`evdev`**: Linux `/dev/input/event*` backend (default).
//! - **`hid`**: Windows `hidapi` + XInput backend (default).
//!
//! The [`virtual_input`] backend is always available and is what the tests and demos run
//! against.

use std::collections::BTreeMap;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::trace;

use crate::device::{DeviceHandle, RawDevice};
use crate::error::BackendError;
use crate::profile::ModelProfile;

#[cfg(all(feature = "evdev", target_os = "linux"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "evdev", target_os = "linux"))))]
pub mod linux;

#[cfg(all(feature = "hid", target_os = "windows"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "hid", target_os = "windows"))))]
pub mod windows;

pub mod virtual_input;

/// Something the hotplug monitor observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HotplugEvent {
    /// A controller appeared and should be opened.
    Arrived(RawDevice),
    /// The device at `locator` reported detachment. Loss is confirmed by probing.
    Departed { locator: String },
    /// Something changed on the bus; re-enumerate everything.
    Rescan,
    /// Something was removed but the backend can't say what; probe every live device.
    ProbeAll,
    /// Devices still listed since the previous scan. Any of them no longer backed by a live
    /// record (a fast replug onto the same node) is opened again.
    Listed(Vec<RawDevice>),
}

/// Why [`HotplugMonitor::wait`] returned.
#[derive(Debug)]
pub enum Wake {
    Events(Vec<HotplugEvent>),
    /// The shutdown channel fired or closed.
    Shutdown,
}

/// Blocking source of hotplug notifications, owned by the enumerator's background thread.
pub trait HotplugMonitor: Send {
    /// Block until something happens on the bus or `shutdown` fires.
    ///
    /// Implementations must return [`Wake::Shutdown`] promptly once `shutdown` receives a
    /// message or is disconnected.
    fn wait(&mut self, shutdown: &Receiver<()>) -> Result<Wake, BackendError>;
}

/// A source of controllers.
pub trait Backend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Set up hotplug notification. Failure here means the backend is unusable.
    fn monitor(&self) -> Result<Box<dyn HotplugMonitor>, BackendError>;

    /// Every joystick-class device attached right now.
    fn enumerate(&self) -> Result<Vec<RawDevice>, BackendError>;

    /// Open `device` for reading.
    fn open(&self, device: &RawDevice) -> Result<DeviceHandle, BackendError>;
}

/// Scan function used by [`PollingMonitor`].
pub type Scan = Box<dyn FnMut() -> Result<Vec<RawDevice>, BackendError> + Send>;

/// Hotplug monitor for platforms without a usable notification source.
///
/// Re-runs a scan every `interval` and reports the difference against the previous scan,
/// keyed by locator. Devices present in both scans are reported as [`HotplugEvent::Listed`],
/// since an unplug and replug between two scans leaves the locator unchanged.
pub struct PollingMonitor {
    scan: Scan,
    interval: Duration,
    known: BTreeMap<String, RawDevice>,
}

impl PollingMonitor {
    /// Takes an initial scan as the baseline.
    pub fn new(mut scan: Scan, interval: Duration) -> Result<Self, BackendError> {
        let known = scan()?
            .into_iter()
            .map(|raw| (raw.locator.clone(), raw))
            .collect();
        Ok(Self {
            scan,
            interval,
            known,
        })
    }

    /// Differences between the last scan and a fresh one.
    pub fn poll(&mut self) -> Result<Vec<HotplugEvent>, BackendError> {
        let current: BTreeMap<String, RawDevice> = (self.scan)()?
            .into_iter()
            .map(|raw| (raw.locator.clone(), raw))
            .collect();

        let mut events = Vec::new();
        for locator in self.known.keys() {
            if !current.contains_key(locator) {
                events.push(HotplugEvent::Departed {
                    locator: locator.clone(),
                });
            }
        }
        let mut listed = Vec::new();
        for (locator, raw) in &current {
            if self.known.contains_key(locator) {
                listed.push(raw.clone());
            } else {
                events.push(HotplugEvent::Arrived(raw.clone()));
            }
        }
        if !events.is_empty() {
            trace!(count = events.len(), "bus changed");
        }
        if !listed.is_empty() {
            events.push(HotplugEvent::Listed(listed));
        }
        self.known = current;
        Ok(events)
    }
}

impl HotplugMonitor for PollingMonitor {
    fn wait(&mut self, shutdown: &Receiver<()>) -> Result<Wake, BackendError> {
        loop {
            match shutdown.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return Ok(Wake::Shutdown),
            }
            let events = self.poll()?;
            if !events.is_empty() {
                return Ok(Wake::Events(events));
            }
        }
    }
}

/// Backend used when no platform backend is compiled in.
pub struct UnsupportedBackend;

impl Backend for UnsupportedBackend {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn monitor(&self) -> Result<Box<dyn HotplugMonitor>, BackendError> {
        Err(BackendError::Unavailable(
            "no input backend is enabled for this platform".into(),
        ))
    }

    fn enumerate(&self) -> Result<Vec<RawDevice>, BackendError> {
        Ok(Vec::new())
    }

    fn open(&self, device: &RawDevice) -> Result<DeviceHandle, BackendError> {
        Err(BackendError::Open {
            locator: device.locator.clone(),
            reason: "no input backend".into(),
        })
    }
}

/// The platform backend for this build.
///
/// `profiles` supplies report layouts to backends that decode raw HID reports themselves.
#[allow(unused_variables, unreachable_code)]
pub fn default_backend(profiles: &[ModelProfile], rescan_interval: Duration) -> Box<dyn Backend> {
    #[cfg(all(feature = "evdev", target_os = "linux"))]
    {
        return Box::new(linux::EvdevBackend::new(rescan_interval));
    }

    #[cfg(all(feature = "hid", target_os = "windows"))]
    {
        return Box::new(windows::WindowsBackend::new(profiles.to_vec(), rescan_interval));
    }

    Box::new(UnsupportedBackend)
}
