//! Device identity types and the open-handle contract.
//!
//! Three different notions of "which device" exist and must not be confused:
//! - [`DeviceDescriptor`] identifies a *model* (vendor/product id pair).
//! - [`DeviceIdentity`] identifies a *physical unit* across unplug/replug, as far as the
//!   platform can tell (USB path on Windows, `uniq`/`phys` on Linux). It may be empty.
//! - [`DeviceId`] is the stable integer this crate hands out. It is assigned once per
//!   physical unit and never reused for a different unit while the process runs.
//!
//! A `RawDevice::locator` is none of the above: it is the backend address used to open
//! the device right now (e.g. `/dev/input/event7`) and may change across reconnects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::RawEvent;
use crate::metadata::DeviceMeta;

/// Vendor/product pair identifying a controller model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceDescriptor {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Opaque, platform-supplied token for one physical unit.
///
/// An empty identity means "cannot be verified": such devices are always treated as new
/// and never matched against dormant records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Identity that can never be matched.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        !self.0.trim().is_empty()
    }

    /// `true` only if both sides are known and equal.
    pub fn matches(&self, other: &DeviceIdentity) -> bool {
        self.is_known() && self == other
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Option<&str>> for DeviceIdentity {
    fn from(value: Option<&str>) -> Self {
        value.map(Self::new).unwrap_or_default()
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            f.write_str(&self.0)
        } else {
            f.write_str("<unknown>")
        }
    }
}

/// Stable numeric id assigned by the [`Enumerator`](crate::enumerator::Enumerator).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Backend-level reference to an attached device, as produced by enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawDevice {
    pub descriptor: DeviceDescriptor,
    pub identity: DeviceIdentity,
    /// Backend address used to open the device (node path, HID path, virtual slot).
    pub locator: String,
    pub meta: DeviceMeta,
}

/// Result of a liveness probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    /// The handle still talks to the device.
    Present,
    /// The device is confirmed gone.
    Gone,
    /// Liveness could not be established right now. Treated as still present.
    Unknown,
}

/// Read failure reported by a [`DeviceHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// The device is physically gone.
    #[error("device is gone")]
    Gone,
    /// Momentary failure; the read may be retried.
    #[error("device busy")]
    Busy,
}

/// An open backend handle, exclusively owned by one live device record.
///
/// Dropping the handle releases the OS resource.
pub trait Device: Send {
    /// Drain events that are queued *right now* into `out`, at most `max_events`.
    ///
    /// Must not block waiting for input. Events pushed before an `Err` are still applied.
    fn read_pending(&mut self, out: &mut Vec<RawEvent>, max_events: usize) -> Result<(), ReadError>;

    /// Check whether the device is still attached.
    fn probe(&mut self) -> Presence;

    /// Current absolute state at open time, expressed as events.
    ///
    /// Backends that can query state directly (evdev) seed the cache with it so a device
    /// reports its resting position before its first event.
    fn initial_state(&mut self, _out: &mut Vec<RawEvent>) {}
}

/// Boxed handle as stored in the device table.
pub type DeviceHandle = Box<dyn Device>;
