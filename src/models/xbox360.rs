//! Xbox 360 controller (wired, wireless receiver and common third-party clones).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use strum::IntoEnumIterator;

use crate::codes::{
    ABS_RX, ABS_RY, ABS_RZ, ABS_X, ABS_Y, ABS_Z, BTN_EAST, BTN_MODE, BTN_NORTH, BTN_SELECT,
    BTN_SOUTH, BTN_START, BTN_THUMBL, BTN_THUMBR, BTN_TL, BTN_TR, BTN_WEST,
};
use crate::decode::Pov;
use crate::device::{DeviceDescriptor, DeviceId};
use crate::enumerator::Enumerator;
use crate::error::EnumeratorError;
use crate::profile::{AxisSpec, ButtonSpec, ModelProfile};
use crate::service::DeviceService;
use crate::state::CachedState;

pub const DESCRIPTORS: [DeviceDescriptor; 4] = [
    DeviceDescriptor::new(0x045e, 0x028e),
    DeviceDescriptor::new(0x0e6f, 0x0401),
    DeviceDescriptor::new(0x045e, 0x0291),
    DeviceDescriptor::new(0x0e6f, 0x0213),
];

pub const AXIS_LEFT_X: &str = "left_x";
pub const AXIS_LEFT_Y: &str = "left_y";
pub const AXIS_RIGHT_X: &str = "right_x";
pub const AXIS_RIGHT_Y: &str = "right_y";
pub const AXIS_LEFT_TRIGGER: &str = "left_trigger";
pub const AXIS_RIGHT_TRIGGER: &str = "right_trigger";

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
pub enum Xbox360Button {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Back,
    Start,
    Guide,
    LeftThumbstick,
    RightThumbstick,
}

impl Xbox360Button {
    pub fn code(self) -> u16 {
        match self {
            Xbox360Button::A => BTN_SOUTH,
            Xbox360Button::B => BTN_EAST,
            Xbox360Button::X => BTN_NORTH,
            Xbox360Button::Y => BTN_WEST,
            Xbox360Button::LeftBumper => BTN_TL,
            Xbox360Button::RightBumper => BTN_TR,
            Xbox360Button::Back => BTN_SELECT,
            Xbox360Button::Start => BTN_START,
            Xbox360Button::Guide => BTN_MODE,
            Xbox360Button::LeftThumbstick => BTN_THUMBL,
            Xbox360Button::RightThumbstick => BTN_THUMBR,
        }
    }
}

/// Built-in profile. The d-pad reports as a hat.
pub fn profile() -> ModelProfile {
    const STICK_MIN: i32 = -32768;
    const STICK_MAX: i32 = 32767;

    ModelProfile {
        name: "Xbox 360 Controller".into(),
        descriptors: DESCRIPTORS.to_vec(),
        axes: vec![
            AxisSpec::new(AXIS_LEFT_X, ABS_X, STICK_MIN, STICK_MAX),
            AxisSpec::new(AXIS_LEFT_Y, ABS_Y, STICK_MIN, STICK_MAX).inverted(),
            AxisSpec::new(AXIS_RIGHT_X, ABS_RX, STICK_MIN, STICK_MAX),
            AxisSpec::new(AXIS_RIGHT_Y, ABS_RY, STICK_MIN, STICK_MAX).inverted(),
            AxisSpec::new(AXIS_LEFT_TRIGGER, ABS_Z, 0, 255).unipolar(),
            AxisSpec::new(AXIS_RIGHT_TRIGGER, ABS_RZ, 0, 255).unipolar(),
        ],
        buttons: Xbox360Button::iter()
            .map(|b| ButtonSpec::new(&b.to_string(), b.code()))
            .collect(),
        hat: true,
        hid_report: None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Xbox360State {
    pub left_x: i32,
    pub left_y: i32,
    pub right_x: i32,
    pub right_y: i32,
    pub left_trigger: i32,
    pub right_trigger: i32,
    pub dpad: Pov,
    pub buttons: BTreeMap<Xbox360Button, bool>,
}

/// Typed access to connected Xbox 360 controllers.
pub struct Xbox360 {
    service: DeviceService,
}

impl Xbox360 {
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

    pub fn left_x(&self, id: DeviceId) -> Option<i32> {
        self.service.axis(id, AXIS_LEFT_X)
    }

    /// Up positive.
    pub fn left_y(&self, id: DeviceId) -> Option<i32> {
        self.service.axis(id, AXIS_LEFT_Y)
    }

    pub fn right_x(&self, id: DeviceId) -> Option<i32> {
        self.service.axis(id, AXIS_RIGHT_X)
    }

    /// Up positive.
    pub fn right_y(&self, id: DeviceId) -> Option<i32> {
        self.service.axis(id, AXIS_RIGHT_Y)
    }

    /// `[0, 100]`.
    pub fn left_trigger(&self, id: DeviceId) -> Option<i32> {
        self.service.axis(id, AXIS_LEFT_TRIGGER)
    }

    /// `[0, 100]`.
    pub fn right_trigger(&self, id: DeviceId) -> Option<i32> {
        self.service.axis(id, AXIS_RIGHT_TRIGGER)
    }

    pub fn dpad(&self, id: DeviceId) -> Option<Pov> {
        self.service.pov(id)
    }

    pub fn button(&self, id: DeviceId, button: Xbox360Button) -> Option<bool> {
        let state = self.service.snapshot(id)?;
        Some(state.button(button.code()))
    }

    pub fn buttons(&self, id: DeviceId) -> Option<BTreeMap<Xbox360Button, bool>> {
        let state = self.service.snapshot(id)?;
        Some(button_map(&state))
    }

    pub fn read(&self, id: DeviceId) -> Option<Xbox360State> {
        let state = self.service.snapshot(id)?;
        let axis = |name| self.service.axis_in(&state, name);
        Some(Xbox360State {
            left_x: axis(AXIS_LEFT_X)?,
            left_y: axis(AXIS_LEFT_Y)?,
            right_x: axis(AXIS_RIGHT_X)?,
            right_y: axis(AXIS_RIGHT_Y)?,
            left_trigger: axis(AXIS_LEFT_TRIGGER)?,
            right_trigger: axis(AXIS_RIGHT_TRIGGER)?,
            dpad: state.pov(),
            buttons: button_map(&state),
        })
    }
}

fn button_map(state: &CachedState) -> BTreeMap<Xbox360Button, bool> {
    Xbox360Button::iter()
        .map(|b| (b, state.button(b.code())))
        .collect()
}
