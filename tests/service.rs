mod common;

use std::sync::Arc;

use common::{record, started, wait_until, OTHER, PAD, STICK};
use joylink::codes::{ABS_RZ, ABS_THROTTLE, ABS_X, ABS_Y, ABS_Z, BTN_SOUTH};
use joylink::models::{extreme_3d_pro, xbox360};
use joylink::{
    ChangeKind, DeviceId, DeviceService, Extreme3dPro, Extreme3dProButton, HatInput, Pov,
    VirtualBackend, Xbox360, Xbox360Button,
};

#[test]
fn services_only_track_their_own_model() {
    let backend = VirtualBackend::new();
    let enumerator = started(&backend);
    let sticks = DeviceService::new(Arc::clone(&enumerator), extreme_3d_pro::profile());
    let pads = DeviceService::new(Arc::clone(&enumerator), xbox360::profile());
    sticks.initialize().unwrap();
    pads.initialize().unwrap();

    let stick = backend.attach(STICK, "stick-1");
    wait_until("stick accepted", || sticks.connected_count() == 1);
    assert_eq!(pads.connected_count(), 0);
    let original = sticks.ids()[0];

    stick.detach();
    wait_until("stick removed", || sticks.connected_count() == 0);

    stick.reattach();
    wait_until("stick back", || sticks.connected_count() == 1);
    assert_eq!(sticks.ids(), [original]);
    assert_eq!(pads.connected_count(), 0);
}

#[test]
fn unknown_models_are_never_accepted() {
    let backend = VirtualBackend::new();
    backend.attach(OTHER, "mystery-1");
    backend.attach(PAD, "pad-1");
    let enumerator = started(&backend);
    let sticks = DeviceService::new(Arc::clone(&enumerator), extreme_3d_pro::profile());
    sticks.initialize().unwrap();

    backend.attach(OTHER, "mystery-2");
    wait_until("all devices seen", || enumerator.connected_count() == 3);
    assert_eq!(enumerator.connected_count(), 3);
    assert!(sticks.ids().is_empty());
}

#[test]
fn ids_are_kept_in_arrival_order() {
    let backend = VirtualBackend::new();
    backend.attach(PAD, "pad-1");
    backend.attach(PAD, "pad-2");
    let enumerator = started(&backend);
    let pads = Xbox360::new(Arc::clone(&enumerator));
    pads.initialize().unwrap();
    backend.attach(PAD, "pad-3");
    wait_until("third pad", || pads.connected_count() == 3);
    assert_eq!(pads.ids(), [DeviceId(0), DeviceId(1), DeviceId(2)]);
}

#[test]
fn invalid_ids_fail_every_getter() {
    let backend = VirtualBackend::new();
    backend.attach(PAD, "pad-1");
    let enumerator = started(&backend);
    let sticks = Extreme3dPro::new(Arc::clone(&enumerator));
    let pads = Xbox360::new(Arc::clone(&enumerator));
    sticks.initialize().unwrap();
    pads.initialize().unwrap();

    // The pad's id is alive in the enumerator but not one of the stick service's.
    let pad_id = pads.ids()[0];
    for id in [pad_id, DeviceId(42)] {
        assert!(!sticks.is_valid_id(id));
        assert_eq!(sticks.x(id), None);
        assert_eq!(sticks.slider(id), None);
        assert_eq!(sticks.pov(id), None);
        assert_eq!(sticks.button(id, Extreme3dProButton::Trigger), None);
        assert_eq!(sticks.buttons(id), None);
        assert_eq!(sticks.read(id), None);
    }
    assert_eq!(pads.left_x(DeviceId(42)), None);
    assert_eq!(pads.service().axis(pad_id, "no-such-axis"), None);
    assert_eq!(pads.service().button(pad_id, "no-such-button"), None);
}

#[test]
fn detached_ids_become_invalid() {
    let backend = VirtualBackend::new();
    let pad = backend.attach(PAD, "pad-1");
    let enumerator = started(&backend);
    let pads = Xbox360::new(Arc::clone(&enumerator));
    pads.initialize().unwrap();
    let id = pads.ids()[0];
    assert_eq!(pads.left_x(id), Some(0));

    pad.detach();
    wait_until("pad removed", || !pads.is_valid_id(id));
    assert_eq!(pads.left_x(id), None);
    assert_eq!(pads.read(id), None);
}

#[test]
fn stick_values_are_normalized() {
    let backend = VirtualBackend::new();
    let stick = backend.attach(STICK, "stick-1");
    let enumerator = started(&backend);
    let sticks = Extreme3dPro::new(Arc::clone(&enumerator));
    sticks.initialize().unwrap();
    let id = sticks.ids()[0];

    stick.set_axis(ABS_X, 1023);
    stick.set_axis(ABS_Y, 0);
    stick.set_axis(ABS_RZ, 0);
    stick.set_axis(ABS_THROTTLE, 255);
    stick.set_hat(HatInput::Angle(Some(27000)));
    stick.press_button(Extreme3dProButton::Trigger.code());

    let state = sticks.read(id).unwrap();
    assert_eq!(state.x, 100);
    assert_eq!(state.y, 100);
    assert_eq!(state.z_rot, -100);
    assert_eq!(state.slider, 0);
    assert_eq!(state.pov, Pov::West);
    assert!(state.buttons[&Extreme3dProButton::Trigger]);
    assert!(!state.buttons[&Extreme3dProButton::Button2]);

    stick.set_hat(HatInput::Angle(None));
    stick.release_button(Extreme3dProButton::Trigger.code());
    assert_eq!(sticks.pov(id), Some(Pov::None));
    assert_eq!(sticks.button(id, Extreme3dProButton::Trigger), Some(false));
}

#[test]
fn pad_dpad_merges_both_hat_axes() {
    let backend = VirtualBackend::new();
    let pad = backend.attach(PAD, "pad-1");
    let enumerator = started(&backend);
    let pads = Xbox360::new(Arc::clone(&enumerator));
    pads.initialize().unwrap();
    let id = pads.ids()[0];

    pad.set_hat(HatInput::Horizontal(-1));
    pad.set_hat(HatInput::Vertical(-1));
    assert_eq!(pads.dpad(id), Some(Pov::NorthWest));

    pad.set_hat(HatInput::Horizontal(0));
    assert_eq!(pads.dpad(id), Some(Pov::North));

    pad.set_axis(ABS_Z, 255);
    pad.press_button(BTN_SOUTH);
    assert_eq!(pads.left_trigger(id), Some(100));
    assert_eq!(pads.right_trigger(id), Some(0));
    assert_eq!(pads.button(id, Xbox360Button::A), Some(true));
    assert_eq!(pads.button(id, Xbox360Button::Guide), Some(false));
}

#[test]
fn late_subscriber_sees_current_devices() {
    let backend = VirtualBackend::new();
    backend.attach(STICK, "stick-1");
    backend.attach(PAD, "pad-1");
    let enumerator = started(&backend);

    let log = record(&enumerator);
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|c| c.kind == ChangeKind::Added));
    assert_eq!(log[0].descriptor, STICK);
    assert_eq!(log[1].descriptor, PAD);
}

#[test]
fn initialize_is_idempotent() {
    let backend = VirtualBackend::new();
    let enumerator = started(&backend);
    {
        let sticks = Extreme3dPro::new(Arc::clone(&enumerator));
        sticks.initialize().unwrap();
        sticks.initialize().unwrap();
        assert!(sticks.service().is_initialized());
    }
    let sticks = DeviceService::new(Arc::clone(&enumerator), extreme_3d_pro::profile());
    sticks.initialize().unwrap();
    backend.attach(STICK, "stick-1");
    wait_until("stick accepted", || sticks.connected_count() == 1);
}

#[test]
fn initialize_fails_when_the_backend_is_unavailable() {
    let backend = VirtualBackend::new();
    backend.set_unavailable(true);
    let enumerator = Arc::new(joylink::Enumerator::new(
        backend.clone(),
        Default::default(),
    ));
    let sticks = Extreme3dPro::new(Arc::clone(&enumerator));
    assert!(sticks.initialize().is_err());
    assert!(!sticks.service().is_initialized());

    backend.set_unavailable(false);
    sticks.initialize().unwrap();
    assert!(sticks.service().is_initialized());
}
