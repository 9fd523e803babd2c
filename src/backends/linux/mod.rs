//! Linux evdev backend.
//!
//! Controllers are `/dev/input/event*` nodes that expose joystick or gamepad buttons.
//! Hotplug is detected by rescanning those nodes every `rescan_interval` while waiting on the
//! shutdown channel, so stopping the thread never depends on the kernel waking it.
//!
//! Identity is the device's `uniq` string when it has one (usually a serial or MAC), otherwise
//! its `phys` topology path.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::backends::{Backend, HotplugMonitor, PollingMonitor};
use crate::codes::{BTN_GAMEPAD, BTN_GAMEPAD_END, BTN_JOYSTICK, BTN_JOYSTICK_END};
use crate::device::{DeviceDescriptor, DeviceHandle, DeviceIdentity, RawDevice};
use crate::error::BackendError;
use crate::metadata::DeviceMeta;

pub mod evdev_device;

pub use evdev_device::EvdevHandle;

const INPUT_DIR: &str = "/dev/input";

pub struct EvdevBackend {
    rescan_interval: Duration,
}

impl EvdevBackend {
    pub fn new(rescan_interval: Duration) -> Self {
        Self { rescan_interval }
    }
}

/// Joystick-class: reports at least one joystick or gamepad button.
fn is_controller(device: &evdev::Device) -> bool {
    device.supported_keys().is_some_and(|keys| {
        keys.iter().any(|key| {
            let code = key.code();
            (BTN_JOYSTICK..BTN_JOYSTICK_END).contains(&code)
                || (BTN_GAMEPAD..BTN_GAMEPAD_END).contains(&code)
        })
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn raw_device(path: &Path, device: &evdev::Device) -> RawDevice {
    let input_id = device.input_id();
    let uniq = non_empty(device.unique_name());
    let phys = non_empty(device.physical_path());
    RawDevice {
        descriptor: DeviceDescriptor::new(input_id.vendor(), input_id.product()),
        identity: DeviceIdentity::from(uniq.or(phys)),
        locator: path.to_string_lossy().into_owned(),
        meta: DeviceMeta {
            bus: Some("evdev".into()),
            product_string: device.name().map(str::to_owned),
            serial_number: uniq.map(str::to_owned),
            path: phys.map(str::to_owned),
        },
    }
}

fn scan() -> Result<Vec<RawDevice>, BackendError> {
    std::fs::metadata(INPUT_DIR)?;
    Ok(evdev::enumerate()
        .filter(|(_, device)| is_controller(device))
        .map(|(path, device)| raw_device(&path, &device))
        .collect())
}

impl Backend for EvdevBackend {
    fn name(&self) -> &'static str {
        "evdev"
    }

    fn monitor(&self) -> Result<Box<dyn HotplugMonitor>, BackendError> {
        std::fs::read_dir(INPUT_DIR)
            .map_err(|e| BackendError::Unavailable(format!("{INPUT_DIR}: {e}")))?;
        let monitor = PollingMonitor::new(Box::new(scan), self.rescan_interval)?;
        debug!(interval = ?self.rescan_interval, "evdev hotplug monitor ready");
        Ok(Box::new(monitor))
    }

    fn enumerate(&self) -> Result<Vec<RawDevice>, BackendError> {
        scan()
    }

    fn open(&self, device: &RawDevice) -> Result<DeviceHandle, BackendError> {
        let handle = EvdevHandle::open(&device.locator).map_err(|e| BackendError::Open {
            locator: device.locator.clone(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(handle))
    }
}
