//! Cached per-device input state.
//!
//! [`CachedState`] is the last-known state of one device, built by folding
//! [`RawEvent`]s into it. It is owned by the device table and handed out as a copy,
//! so a reader always sees one consistent state and never a half-applied update.
//!
//! Buttons and axes are sparse: codes that never reported anything are simply absent.
//! Event-driven backends fill them as events arrive; poll-based backends report every
//! index of their dense report on each read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::decode::{Compass, Pov};
use crate::event::{HatInput, RawEvent};

/// Last-known axes, buttons and hat of one device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedState {
    /// Raw axis values keyed by axis code.
    pub axes: BTreeMap<u16, i32>,
    /// Button state keyed by button code.
    pub buttons: BTreeMap<u16, bool>,
    /// Hat position as a compass mask.
    pub hat: Compass,
}

impl CachedState {
    /// Fold one event into the state.
    pub fn apply(&mut self, event: &RawEvent) {
        match *event {
            RawEvent::Axis { code, value } => {
                self.axes.insert(code, value);
            }
            RawEvent::Button { code, pressed } => {
                self.buttons.insert(code, pressed);
            }
            RawEvent::Hat(HatInput::Angle(angle)) => {
                self.hat = Pov::from_angle(angle).compass();
            }
            RawEvent::Hat(HatInput::Horizontal(value)) => {
                self.hat = self.hat.with_horizontal(value);
            }
            RawEvent::Hat(HatInput::Vertical(value)) => {
                self.hat = self.hat.with_vertical(value);
            }
        }
    }

    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a RawEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Raw axis value (`None` if the axis never reported).
    pub fn axis(&self, code: u16) -> Option<i32> {
        self.axes.get(&code).copied()
    }

    /// Button state (released if the button never reported).
    pub fn button(&self, code: u16) -> bool {
        self.buttons.get(&code).copied().unwrap_or(false)
    }

    pub fn pov(&self) -> Pov {
        Pov::from(self.hat)
    }

    /// `true` for the all-default state handed out for a lost device.
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty() && self.buttons.is_empty() && self.hat.is_empty()
    }
}
