//! Raw input events and device lifecycle notifications.
//!
//! Backends describe input changes as small deltas ([`RawEvent`]) in their own code space.
//! The crate uses the Linux input-event code space throughout (`ABS_*`, `BTN_*`), so
//! backends for other platforms translate into it (see [`ReportLayout`](crate::report::ReportLayout)).
//!
//! ## Value conventions
//! - **Axes:** raw, uncalibrated register values. Normalization happens at decode time
//!   against the model's calibrated range.
//! - **Buttons:** boolean state.
//! - **Hats:** either a continuous angle in hundredths of a degree (clockwise from north), or
//!   one tri-state axis (`-1`, `0`, `1`) of a two-axis hat.

use crate::device::{DeviceDescriptor, DeviceId};

/// How a hat (POV / d-pad) reports its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HatInput {
    /// Continuous encoding: hundredths of a degree clockwise from north, `None` when centered.
    Angle(Option<u32>),
    /// Horizontal tri-state axis: `-1` west, `0` centered, `1` east.
    Horizontal(i32),
    /// Vertical tri-state axis: `-1` north, `0` centered, `1` south.
    Vertical(i32),
}

/// Per-device input change produced by [`Device::read_pending`](crate::device::Device::read_pending).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawEvent {
    /// An absolute axis changed.
    Axis { code: u16, value: i32 },

    /// A button changed state.
    Button { code: u16, pressed: bool },

    /// The hat moved.
    Hat(HatInput),
}

/// Whether a device appeared or went away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Removed,
}

/// One-shot lifecycle notification delivered to every subscriber of an
/// [`Enumerator`](crate::enumerator::Enumerator), in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceStateChange {
    pub kind: ChangeKind,
    pub descriptor: DeviceDescriptor,
    pub id: DeviceId,
}

impl DeviceStateChange {
    pub(crate) fn added(id: DeviceId, descriptor: DeviceDescriptor) -> Self {
        Self {
            kind: ChangeKind::Added,
            descriptor,
            id,
        }
    }

    pub(crate) fn removed(id: DeviceId, descriptor: DeviceDescriptor) -> Self {
        Self {
            kind: ChangeKind::Removed,
            descriptor,
            id,
        }
    }
}
