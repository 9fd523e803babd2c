//! Linux input-event codes used by the built-in models.
//!
//! Values match `linux/input-event-codes.h`.

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_Z: u16 = 0x02;
pub const ABS_RX: u16 = 0x03;
pub const ABS_RY: u16 = 0x04;
pub const ABS_RZ: u16 = 0x05;
pub const ABS_THROTTLE: u16 = 0x06;
pub const ABS_HAT0X: u16 = 0x10;
pub const ABS_HAT0Y: u16 = 0x11;

/// First joystick button (`BTN_TRIGGER`); joystick buttons run contiguously from here.
pub const BTN_JOYSTICK: u16 = 0x120;
/// One past the last joystick-class button (`BTN_DEAD`).
pub const BTN_JOYSTICK_END: u16 = 0x130;

pub const BTN_SOUTH: u16 = 0x130;
pub const BTN_EAST: u16 = 0x131;
pub const BTN_NORTH: u16 = 0x133;
pub const BTN_WEST: u16 = 0x134;
pub const BTN_TL: u16 = 0x136;
pub const BTN_TR: u16 = 0x137;
pub const BTN_SELECT: u16 = 0x13a;
pub const BTN_START: u16 = 0x13b;
pub const BTN_MODE: u16 = 0x13c;
pub const BTN_THUMBL: u16 = 0x13d;
pub const BTN_THUMBR: u16 = 0x13e;

/// `BTN_A` .. `BTN_THUMBR` plus the d-pad buttons.
pub const BTN_GAMEPAD: u16 = 0x130;
pub const BTN_GAMEPAD_END: u16 = 0x140;
