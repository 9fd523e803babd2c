#![cfg(target_os = "windows")]

//! Windows backend: HID controllers via `hidapi` plus XInput pads.
//!
//! Neither source has a notification channel usable without a message window, so hotplug
//! detection diffs periodic rescans of both while waiting on the shutdown channel.
//!
//! HID reports are decoded with the [`ReportLayout`](crate::report::ReportLayout) of the
//! matching profile; HID devices without one are not listed.

use std::ffi::CString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hidapi::HidApi;
use tracing::debug;

use crate::backends::{Backend, HotplugMonitor, PollingMonitor};
use crate::device::{DeviceHandle, RawDevice};
use crate::error::BackendError;
use crate::profile::ModelProfile;

pub mod hid_device;
pub mod hid_discovery;
pub mod xinput_devices;

pub use hid_device::HidHandle;
pub use xinput_devices::XInputHandle;

/// `hidapi` context, created when the monitor is set up.
pub(crate) type SharedApi = Arc<Mutex<Option<HidApi>>>;

pub struct WindowsBackend {
    api: SharedApi,
    profiles: Arc<Vec<ModelProfile>>,
    rescan_interval: Duration,
}

impl WindowsBackend {
    pub fn new(profiles: Vec<ModelProfile>, rescan_interval: Duration) -> Self {
        Self {
            api: Arc::new(Mutex::new(None)),
            profiles: Arc::new(profiles),
            rescan_interval,
        }
    }

    fn api(&self) -> MutexGuard<'_, Option<HidApi>> {
        self.api.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn scan(api: &SharedApi, profiles: &[ModelProfile]) -> Result<Vec<RawDevice>, BackendError> {
    let mut guard = api.lock().unwrap_or_else(PoisonError::into_inner);
    let api = guard
        .as_mut()
        .ok_or_else(|| BackendError::Unavailable("hidapi not initialized".into()))?;
    api.refresh_devices()
        .map_err(|e| BackendError::Malformed(format!("hid refresh failed: {e}")))?;
    let mut found = hid_discovery::scan(api, profiles);
    drop(guard);
    found.extend(xinput_devices::scan());
    Ok(found)
}

impl Backend for WindowsBackend {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn monitor(&self) -> Result<Box<dyn HotplugMonitor>, BackendError> {
        {
            let mut api = self.api();
            if api.is_none() {
                let created =
                    HidApi::new().map_err(|e| BackendError::Unavailable(e.to_string()))?;
                *api = Some(created);
            }
        }
        let shared = Arc::clone(&self.api);
        let profiles = Arc::clone(&self.profiles);
        let monitor = PollingMonitor::new(
            Box::new(move || scan(&shared, &profiles)),
            self.rescan_interval,
        )?;
        debug!(interval = ?self.rescan_interval, "windows hotplug monitor ready");
        Ok(Box::new(monitor))
    }

    fn enumerate(&self) -> Result<Vec<RawDevice>, BackendError> {
        scan(&self.api, &self.profiles)
    }

    fn open(&self, device: &RawDevice) -> Result<DeviceHandle, BackendError> {
        let open_error = |reason: String| BackendError::Open {
            locator: device.locator.clone(),
            reason,
        };

        if let Some(slot) = xinput_devices::parse_locator(&device.locator) {
            return Ok(Box::new(XInputHandle::new(slot)));
        }

        let layout = hid_discovery::layout_for(&self.profiles, &device.descriptor)
            .cloned()
            .ok_or_else(|| open_error("no report layout for this model".into()))?;
        let path = CString::new(device.locator.as_bytes())
            .map_err(|_| open_error("path contains a NUL byte".into()))?;

        let guard = self.api();
        let api = guard
            .as_ref()
            .ok_or_else(|| open_error("hidapi not initialized".into()))?;
        let raw = api.open_path(&path).map_err(|e| open_error(e.to_string()))?;
        drop(guard);
        // Reads are drained on demand; never block the caller.
        raw.set_blocking_mode(false)
            .map_err(|e| open_error(e.to_string()))?;

        Ok(Box::new(HidHandle::new(
            Arc::clone(&self.api),
            device.locator.clone(),
            raw,
            layout,
        )))
    }
}
