//! Logitech Extreme 3D Pro flight stick.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use strum::IntoEnumIterator;

use crate::codes::{ABS_RZ, ABS_THROTTLE, ABS_X, ABS_Y, BTN_JOYSTICK};
use crate::decode::Pov;
use crate::device::{DeviceDescriptor, DeviceId};
use crate::enumerator::Enumerator;
use crate::error::EnumeratorError;
use crate::profile::{AxisSpec, ButtonSpec, ModelProfile};
use crate::report::{AxisField, BitField, ButtonField, HatField, ReportLayout};
use crate::service::DeviceService;
use crate::state::CachedState;

pub const DESCRIPTOR: DeviceDescriptor = DeviceDescriptor::new(0x046d, 0xc215);

pub const AXIS_X: &str = "x";
pub const AXIS_Y: &str = "y";
pub const AXIS_Z_ROT: &str = "z_rot";
pub const AXIS_SLIDER: &str = "slider";

/// Buttons as labelled on the stick.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumCount,
)]
pub enum Extreme3dProButton {
    Trigger,
    Button2,
    Button3,
    Button4,
    Button5,
    Button6,
    Button7,
    Button8,
    Button9,
    Button10,
    Button11,
    Button12,
}

impl Extreme3dProButton {
    /// Input code (`BTN_TRIGGER` + index).
    pub fn code(self) -> u16 {
        BTN_JOYSTICK + self as u16
    }
}

/// Built-in profile.
pub fn profile() -> ModelProfile {
    let buttons = Extreme3dProButton::iter()
        .map(|b| ButtonSpec::new(&b.to_string(), b.code()))
        .collect();

    // Report: x:10 y:10 hat:4 | twist:8 | buttons 1-8 | slider:8 | buttons 9-12 in the low nibble.
    let mut report_buttons: Vec<ButtonField> = Extreme3dProButton::iter()
        .take(8)
        .enumerate()
        .map(|(i, b)| ButtonField {
            code: b.code(),
            bit: 32 + i as u32,
        })
        .collect();
    report_buttons.extend(
        Extreme3dProButton::iter()
            .skip(8)
            .enumerate()
            .map(|(i, b)| ButtonField {
                code: b.code(),
                bit: 48 + i as u32,
            }),
    );

    ModelProfile {
        name: "Logitech Extreme 3D Pro".into(),
        descriptors: vec![DESCRIPTOR],
        axes: vec![
            AxisSpec::new(AXIS_X, ABS_X, 0, 1023),
            AxisSpec::new(AXIS_Y, ABS_Y, 0, 1023).inverted(),
            AxisSpec::new(AXIS_Z_ROT, ABS_RZ, 0, 255),
            // Raw maximum is the "-" end of the slider.
            AxisSpec::new(AXIS_SLIDER, ABS_THROTTLE, 0, 255)
                .unipolar()
                .inverted(),
        ],
        buttons,
        hat: true,
        hid_report: Some(ReportLayout {
            report_id: None,
            axes: vec![
                AxisField {
                    code: ABS_X,
                    field: BitField::new(0, 10),
                    signed: false,
                },
                AxisField {
                    code: ABS_Y,
                    field: BitField::new(10, 10),
                    signed: false,
                },
                AxisField {
                    code: ABS_RZ,
                    field: BitField::byte(3),
                    signed: false,
                },
                AxisField {
                    code: ABS_THROTTLE,
                    field: BitField::byte(5),
                    signed: false,
                },
            ],
            buttons: report_buttons,
            hat: Some(HatField {
                field: BitField::new(20, 4),
                positions: 8,
                step: crate::decode::ANGLE_STEP,
            }),
        }),
    }
}

/// Every value of one stick, decoded from a single snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Extreme3dProState {
    pub x: i32,
    pub y: i32,
    pub z_rot: i32,
    pub slider: i32,
    pub pov: Pov,
    pub buttons: BTreeMap<Extreme3dProButton, bool>,
}

/// Typed access to connected Extreme 3D Pro sticks.
pub struct Extreme3dPro {
    service: DeviceService,
}

impl Extreme3dPro {
    pub fn new(enumerator: Arc<Enumerator>) -> Self {
        Self {
            service: DeviceService::new(enumerator, profile()),
        }
    }

    pub fn initialize(&self) -> Result<(), EnumeratorError> {
        self.service.initialize()
    }

    pub fn ids(&self) -> Vec<DeviceId> {
        self.service.ids()
    }

    pub fn connected_count(&self) -> usize {
        self.service.connected_count()
    }

    pub fn is_valid_id(&self, id: DeviceId) -> bool {
        self.service.is_valid_id(id)
    }

    pub fn service(&self) -> &DeviceService {
        &self.service
    }

    /// `[-100, 100]`, right positive.
    pub fn x(&self, id: DeviceId) -> Option<i32> {
        self.service.axis(id, AXIS_X)
    }

    /// `[-100, 100]`, forward positive.
    pub fn y(&self, id: DeviceId) -> Option<i32> {
        self.service.axis(id, AXIS_Y)
    }

    /// Twist, `[-100, 100]`, clockwise positive.
    pub fn z_rot(&self, id: DeviceId) -> Option<i32> {
        self.service.axis(id, AXIS_Z_ROT)
    }

    /// `[0, 100]`, 100 at the "+" end.
    pub fn slider(&self, id: DeviceId) -> Option<i32> {
        self.service.axis(id, AXIS_SLIDER)
    }

    pub fn pov(&self, id: DeviceId) -> Option<Pov> {
        self.service.pov(id)
    }

    pub fn button(&self, id: DeviceId, button: Extreme3dProButton) -> Option<bool> {
        let state = self.service.snapshot(id)?;
        Some(state.button(button.code()))
    }

    pub fn buttons(&self, id: DeviceId) -> Option<BTreeMap<Extreme3dProButton, bool>> {
        let state = self.service.snapshot(id)?;
        Some(button_map(&state))
    }

    pub fn read(&self, id: DeviceId) -> Option<Extreme3dProState> {
        let state = self.service.snapshot(id)?;
        Some(Extreme3dProState {
            x: self.service.axis_in(&state, AXIS_X)?,
            y: self.service.axis_in(&state, AXIS_Y)?,
            z_rot: self.service.axis_in(&state, AXIS_Z_ROT)?,
            slider: self.service.axis_in(&state, AXIS_SLIDER)?,
            pov: state.pov(),
            buttons: button_map(&state),
        })
    }
}

fn button_map(state: &CachedState) -> BTreeMap<Extreme3dProButton, bool> {
    Extreme3dProButton::iter()
        .map(|b| (b, state.button(b.code())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{HatInput, RawEvent};
    use strum::EnumCount;

    #[test]
    fn profile_is_valid_and_complete() {
        let profile = profile();
        profile.validate().unwrap();
        assert_eq!(profile.buttons.len(), Extreme3dProButton::COUNT);
        assert_eq!(profile.button("Button12").map(|b| b.code), Some(0x12b));
        assert_eq!(profile.hid_report.as_ref().map(ReportLayout::payload_len), Some(7));
    }

    #[test]
    fn report_decodes_into_profile_codes() {
        let layout = profile().hid_report.unwrap();
        // x = 1023, y = 0, hat = 2 (east), twist = 128, buttons 1 and 8, slider = 0, button 12.
        let packed: u32 = 1023 | (2 << 20) | (128 << 24);
        let mut report = packed.to_le_bytes().to_vec();
        report.extend([0b1000_0001, 0, 0b0000_1000]);

        let mut events = Vec::new();
        layout.decode(&report, &mut events).unwrap();
        let mut state = CachedState::default();
        state.apply_all(&events);

        assert_eq!(state.axis(ABS_X), Some(1023));
        assert_eq!(state.axis(ABS_Y), Some(0));
        assert_eq!(state.axis(ABS_RZ), Some(128));
        assert_eq!(state.pov(), Pov::East);
        let buttons = button_map(&state);
        assert!(buttons[&Extreme3dProButton::Trigger]);
        assert!(buttons[&Extreme3dProButton::Button8]);
        assert!(!buttons[&Extreme3dProButton::Button9]);
        assert!(buttons[&Extreme3dProButton::Button12]);
        assert!(events.contains(&RawEvent::Hat(HatInput::Angle(Some(9000)))));
    }

    #[test]
    fn slider_reads_like_the_markings() {
        let profile = profile();
        let slider = profile.axis(AXIS_SLIDER).unwrap();
        assert_eq!(slider.normalize(0), 100);
        assert_eq!(slider.normalize(255), 0);
        let y = profile.axis(AXIS_Y).unwrap();
        assert_eq!(y.normalize(0), 100);
    }
}
