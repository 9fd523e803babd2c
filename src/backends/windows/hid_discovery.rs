#![cfg(target_os = "windows")]

//! Windows HID discovery.
//!
//! Lists `hidapi` entries that look like game controls and that some profile knows how to
//! decode. The HID path is both the locator and the identity: it is stable for a given unit
//! on a given USB port.

use hidapi::{DeviceInfo, HidApi};

use crate::device::{DeviceDescriptor, DeviceIdentity, RawDevice};
use crate::metadata::DeviceMeta;
use crate::profile::ModelProfile;
use crate::report::ReportLayout;

/// Whether a `hidapi` entry can be a game controller.
///
/// Game controls live on the Generic Desktop (`0x01`), Simulation (`0x02`), Physical
/// Interface (`0x0F`) or a vendor (`0xFFxx`) usage page. Mice and keyboards on Generic Desktop
/// are skipped, and so are the `IG_` gamepad endpoints XInput already exposes.
pub fn accept_device(info: &DeviceInfo) -> bool {
    let page = info.usage_page();
    let usage = info.usage();

    let generic_desktop = page == 0x01;
    let game_page = generic_desktop || matches!(page, 0x02 | 0x0F) || page & 0xFF00 == 0xFF00;
    if !game_page {
        return false;
    }

    match usage {
        // Mouse, keyboard.
        0x02 | 0x06 if generic_desktop => false,
        // Gamepad.
        0x05 if generic_desktop => !info.path().to_string_lossy().contains("IG_"),
        _ => true,
    }
}

/// Report layout for `descriptor`, if any profile has one.
pub fn layout_for<'a>(
    profiles: &'a [ModelProfile],
    descriptor: &DeviceDescriptor,
) -> Option<&'a ReportLayout> {
    profiles
        .iter()
        .filter(|p| p.recognizes(descriptor))
        .find_map(|p| p.hid_report.as_ref())
}

fn descriptor(info: &DeviceInfo) -> DeviceDescriptor {
    DeviceDescriptor::new(info.vendor_id(), info.product_id())
}

/// Build the [`RawDevice`] for a `hidapi` entry.
fn raw_device(info: &DeviceInfo) -> RawDevice {
    let path = info.path().to_string_lossy().into_owned();
    RawDevice {
        descriptor: descriptor(info),
        identity: DeviceIdentity::new(path.clone()),
        meta: DeviceMeta {
            bus: Some("usb".into()),
            product_string: info.product_string().map(str::to_owned),
            serial_number: info.serial_number().map(str::to_owned),
            path: Some(path.clone()),
        },
        locator: path,
    }
}

/// Decodable controllers in `api`'s current device list.
pub fn scan(api: &HidApi, profiles: &[ModelProfile]) -> Vec<RawDevice> {
    api.device_list()
        .filter(|info| accept_device(info))
        .filter(|info| layout_for(profiles, &descriptor(info)).is_some())
        .map(raw_device)
        .collect()
}
