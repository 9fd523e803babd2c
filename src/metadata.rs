//! Descriptive device metadata.
//!
//! Backends fill in whatever their platform reports. None of it is used to decide whether two
//! observations are the same unit; that is [`DeviceIdentity`](crate::device::DeviceIdentity).

use serde::{Deserialize, Serialize};

/// What the platform says about a device, for logs and diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// Transport hint: `"usb"`, `"evdev"`, `"xinput"`, ...
    pub bus: Option<String>,
    pub product_string: Option<String>,
    pub serial_number: Option<String>,
    /// Platform topology path. Opaque.
    pub path: Option<String>,
}

impl DeviceMeta {
    /// Product string, or `"Unknown"`.
    pub fn display_name(&self) -> &str {
        self.product_string
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Unknown")
    }
}
