//! evdev device handle.
//!
//! [`EvdevHandle`] wraps an `evdev::Device` opened in non-blocking mode and translates its
//! event stream into [`RawEvent`]s. The kernel queue is drained with `fetch_events` until it
//! reports `WouldBlock`; events beyond the per-call bound are kept in a backlog for the next
//! call, never dropped.

use std::collections::VecDeque;
use std::io;

use evdev::{AbsoluteAxisCode, EventSummary};
use tracing::trace;

use crate::device::{Device, Presence, ReadError};
use crate::event::{HatInput, RawEvent};

/// `errno` for a device node whose device is gone.
const ENODEV: i32 = 19;

pub struct EvdevHandle {
    device: evdev::Device,
    locator: String,
    backlog: VecDeque<RawEvent>,
}

impl EvdevHandle {
    pub fn open(path: &str) -> io::Result<Self> {
        let device = evdev::Device::open(path)?;
        device.set_nonblocking(true)?;
        Ok(Self {
            device,
            locator: path.to_owned(),
            backlog: VecDeque::new(),
        })
    }
}

fn axis_event(axis: AbsoluteAxisCode, value: i32) -> RawEvent {
    if axis == AbsoluteAxisCode::ABS_HAT0X {
        RawEvent::Hat(HatInput::Horizontal(value))
    } else if axis == AbsoluteAxisCode::ABS_HAT0Y {
        RawEvent::Hat(HatInput::Vertical(value))
    } else {
        RawEvent::Axis {
            code: axis.0,
            value,
        }
    }
}

fn translate(event: evdev::InputEvent) -> Option<RawEvent> {
    match event.destructure() {
        EventSummary::Key(_, key, value) => Some(RawEvent::Button {
            code: key.code(),
            pressed: value != 0,
        }),
        EventSummary::AbsoluteAxis(_, axis, value) => Some(axis_event(axis, value)),
        EventSummary::Synchronization(..) => None,
        _ => {
            trace!(kind = ?event.event_type(), code = event.code(), "ignoring event");
            None
        }
    }
}

fn is_gone(e: &io::Error) -> bool {
    e.raw_os_error() == Some(ENODEV)
}

impl Device for EvdevHandle {
    fn read_pending(&mut self, out: &mut Vec<RawEvent>, max_events: usize) -> Result<(), ReadError> {
        let mut taken = 0;
        loop {
            while taken < max_events {
                match self.backlog.pop_front() {
                    Some(event) => {
                        out.push(event);
                        taken += 1;
                    }
                    None => break,
                }
            }
            if taken >= max_events {
                return Ok(());
            }

            match self.device.fetch_events() {
                Ok(events) => self.backlog.extend(events.filter_map(translate)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if is_gone(&e) => {
                    trace!(locator = %self.locator, "device node went away");
                    return Err(ReadError::Gone);
                }
                Err(e) => {
                    trace!(locator = %self.locator, error = %e, "read failed");
                    return Err(ReadError::Busy);
                }
            }
        }
    }

    fn probe(&mut self) -> Presence {
        match self.device.get_key_state() {
            Ok(_) => Presence::Present,
            Err(e) if is_gone(&e) => Presence::Gone,
            Err(_) => Presence::Unknown,
        }
    }

    fn initial_state(&mut self, out: &mut Vec<RawEvent>) {
        if let Ok(axes) = self.device.get_absinfo() {
            out.extend(axes.map(|(axis, info)| axis_event(axis, info.value())));
        }
        if let Ok(keys) = self.device.get_key_state() {
            out.extend(keys.iter().map(|key| RawEvent::Button {
                code: key.code(),
                pressed: true,
            }));
        }
    }
}
