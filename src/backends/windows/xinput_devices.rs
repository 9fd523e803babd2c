#![cfg(target_os = "windows")]

//! XInput controllers (slots 0–3).
//!
//! Xbox-style pads show up both as an XInput slot and as a HID compatibility endpoint; the
//! HID side is filtered out during discovery so each pad is only counted once.
//!
//! XInput state is translated into the Linux code space the profiles use: stick Y axes
//! follow the evdev convention (up negative), triggers are `ABS_Z`/`ABS_RZ` in `0..255`, and
//! the d-pad drives the two hat axes.
//!
//! XInput exposes no per-unit identity, so the slot (`xinput:{n}`) doubles as identity. A
//! pad that comes back in another slot gets a new id.

use windows_sys::Win32::Foundation::ERROR_DEVICE_NOT_CONNECTED;
use windows_sys::Win32::UI::Input::XboxController::*;

use crate::codes::{
    ABS_RX, ABS_RY, ABS_RZ, ABS_X, ABS_Y, ABS_Z, BTN_EAST, BTN_NORTH, BTN_SELECT, BTN_SOUTH,
    BTN_START, BTN_THUMBL, BTN_THUMBR, BTN_TL, BTN_TR, BTN_WEST,
};
use crate::device::{Device, DeviceDescriptor, DeviceIdentity, Presence, RawDevice, ReadError};
use crate::event::{HatInput, RawEvent};
use crate::metadata::DeviceMeta;

pub const SLOTS: u32 = 4;
pub const LOCATOR_PREFIX: &str = "xinput:";

/// XInput does not report vendor/product ids; every slot presents as a wired 360 pad.
const DESCRIPTOR: DeviceDescriptor = DeviceDescriptor::new(0x045e, 0x028e);

const BUTTON_MAP: &[(u16, u16)] = &[
    (XINPUT_GAMEPAD_A, BTN_SOUTH),
    (XINPUT_GAMEPAD_B, BTN_EAST),
    (XINPUT_GAMEPAD_X, BTN_NORTH),
    (XINPUT_GAMEPAD_Y, BTN_WEST),
    (XINPUT_GAMEPAD_LEFT_SHOULDER, BTN_TL),
    (XINPUT_GAMEPAD_RIGHT_SHOULDER, BTN_TR),
    (XINPUT_GAMEPAD_BACK, BTN_SELECT),
    (XINPUT_GAMEPAD_START, BTN_START),
    (XINPUT_GAMEPAD_LEFT_THUMB, BTN_THUMBL),
    (XINPUT_GAMEPAD_RIGHT_THUMB, BTN_THUMBR),
];

fn get_state(slot: u32) -> Result<XINPUT_STATE, u32> {
    // SAFETY: XINPUT_STATE is plain data; XInputGetState fills it on success.
    let mut state: XINPUT_STATE = unsafe { std::mem::zeroed() };
    let res = unsafe { XInputGetState(slot, &mut state) };
    if res == 0 {
        Ok(state)
    } else {
        Err(res)
    }
}

/// Connected slots.
pub fn scan() -> Vec<RawDevice> {
    (0..SLOTS)
        .filter(|&slot| get_state(slot).is_ok())
        .map(|slot| {
            let locator = format!("{LOCATOR_PREFIX}{slot}");
            RawDevice {
                descriptor: DESCRIPTOR,
                identity: DeviceIdentity::new(locator.clone()),
                meta: DeviceMeta {
                    bus: Some("xinput".into()),
                    product_string: Some(format!("XInput Controller {slot}")),
                    serial_number: None,
                    path: Some(locator.clone()),
                },
                locator,
            }
        })
        .collect()
}

/// Slot number from an `xinput:{n}` locator.
pub fn parse_locator(locator: &str) -> Option<u32> {
    locator
        .strip_prefix(LOCATOR_PREFIX)?
        .parse()
        .ok()
        .filter(|&slot| slot < SLOTS)
}

pub struct XInputHandle {
    slot: u32,
    last_packet: Option<u32>,
}

impl XInputHandle {
    pub fn new(slot: u32) -> Self {
        Self {
            slot,
            last_packet: None,
        }
    }

    fn emit(state: &XINPUT_STATE, out: &mut Vec<RawEvent>) {
        let gp = state.Gamepad;
        // evdev reports stick Y with up negative.
        let flip = |v: i16| -1 - i32::from(v);
        out.extend([
            RawEvent::Axis {
                code: ABS_X,
                value: i32::from(gp.sThumbLX),
            },
            RawEvent::Axis {
                code: ABS_Y,
                value: flip(gp.sThumbLY),
            },
            RawEvent::Axis {
                code: ABS_RX,
                value: i32::from(gp.sThumbRX),
            },
            RawEvent::Axis {
                code: ABS_RY,
                value: flip(gp.sThumbRY),
            },
            RawEvent::Axis {
                code: ABS_Z,
                value: i32::from(gp.bLeftTrigger),
            },
            RawEvent::Axis {
                code: ABS_RZ,
                value: i32::from(gp.bRightTrigger),
            },
        ]);

        let buttons: u16 = gp.wButtons;
        out.extend(BUTTON_MAP.iter().map(|&(mask, code)| RawEvent::Button {
            code,
            pressed: buttons & mask != 0,
        }));

        let axis = |neg: u16, pos: u16| {
            i32::from(buttons & pos != 0) - i32::from(buttons & neg != 0)
        };
        out.push(RawEvent::Hat(HatInput::Horizontal(axis(
            XINPUT_GAMEPAD_DPAD_LEFT,
            XINPUT_GAMEPAD_DPAD_RIGHT,
        ))));
        out.push(RawEvent::Hat(HatInput::Vertical(axis(
            XINPUT_GAMEPAD_DPAD_UP,
            XINPUT_GAMEPAD_DPAD_DOWN,
        ))));
    }
}

impl Device for XInputHandle {
    fn read_pending(&mut self, out: &mut Vec<RawEvent>, _max_events: usize) -> Result<(), ReadError> {
        match get_state(self.slot) {
            Ok(state) => {
                if self.last_packet != Some(state.dwPacketNumber) {
                    self.last_packet = Some(state.dwPacketNumber);
                    Self::emit(&state, out);
                }
                Ok(())
            }
            Err(ERROR_DEVICE_NOT_CONNECTED) => Err(ReadError::Gone),
            Err(_) => Err(ReadError::Busy),
        }
    }

    fn probe(&mut self) -> Presence {
        match get_state(self.slot) {
            Ok(_) => Presence::Present,
            Err(ERROR_DEVICE_NOT_CONNECTED) => Presence::Gone,
            Err(_) => Presence::Unknown,
        }
    }

    fn initial_state(&mut self, out: &mut Vec<RawEvent>) {
        if let Ok(state) = get_state(self.slot) {
            self.last_packet = Some(state.dwPacketNumber);
            Self::emit(&state, out);
        }
    }
}
