#![cfg(target_os = "windows")]

//! Windows HID device handle.
//!
//! [`HidHandle`] wraps a non-blocking `hidapi::HidDevice` and the model's [`ReportLayout`].
//! Every input report carries the full device state, so a drain reads everything queued
//! and decodes only the newest report.

use hidapi::HidDevice;
use tracing::trace;

use crate::backends::windows::SharedApi;
use crate::device::{Device, Presence, ReadError};
use crate::event::RawEvent;
use crate::report::ReportLayout;

/// Maximum number of HID reports drained per read.
///
/// Prevents a single device from starving the caller if it produces data faster than it is
/// being queried.
const MAX_REPORTS_PER_TICK: usize = 32;

pub struct HidHandle {
    api: SharedApi,
    path: String,
    raw: HidDevice,
    layout: ReportLayout,
    buf: Vec<u8>,
}

impl HidHandle {
    pub fn new(api: SharedApi, path: String, raw: HidDevice, layout: ReportLayout) -> Self {
        // Some hidapi builds prepend a zero report id, leave room for it.
        let buf = vec![0u8; (layout.report_len() + 1).max(64)];
        Self {
            api,
            path,
            raw,
            layout,
            buf,
        }
    }
}

impl Device for HidHandle {
    fn read_pending(&mut self, out: &mut Vec<RawEvent>, _max_events: usize) -> Result<(), ReadError> {
        let mut newest = None;
        for _ in 0..MAX_REPORTS_PER_TICK {
            match self.raw.read(&mut self.buf) {
                Ok(0) => break,
                Ok(n) => newest = Some(n),
                Err(e) => {
                    trace!(path = %self.path, error = %e, "read failed");
                    return Err(ReadError::Busy);
                }
            }
        }

        if let Some(n) = newest {
            if let Err(e) = self.layout.decode(&self.buf[..n], out) {
                trace!(path = %self.path, error = %e, "ignoring undecodable report");
            }
        }
        Ok(())
    }

    fn probe(&mut self) -> Presence {
        let Ok(mut guard) = self.api.lock() else {
            return Presence::Unknown;
        };
        let Some(api) = guard.as_mut() else {
            return Presence::Unknown;
        };
        if api.refresh_devices().is_err() {
            return Presence::Unknown;
        }
        let attached = api
            .device_list()
            .any(|info| info.path().to_string_lossy() == self.path);
        if attached {
            Presence::Present
        } else {
            Presence::Gone
        }
    }
}
