mod common;

use common::{record, started, wait_until, OTHER, PAD, STICK};
use joylink::{
    ChangeKind, DeviceId, DeviceIdentity, DeviceMeta, HotplugEvent, RawDevice, VirtualBackend,
};

#[test]
fn reattached_unit_keeps_its_id() {
    let backend = VirtualBackend::new();
    let stick = backend.attach(STICK, "stick-serial-1");
    let enumerator = started(&backend);
    let log = record(&enumerator);

    let first = enumerator.devices()[0].id;
    for _ in 0..3 {
        stick.detach();
        wait_until("removal", || enumerator.connected_count() == 0);
        stick.reattach();
        wait_until("reconnect", || enumerator.connected_count() == 1);
    }
    wait_until("last notification", || log.lock().unwrap().len() == 7);

    let devices = enumerator.devices();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, first);
    assert!(devices[0].alive);

    let kinds: Vec<ChangeKind> = log.lock().unwrap().iter().map(|c| c.kind).collect();
    for (i, kind) in kinds.iter().enumerate() {
        let expected = if i % 2 == 0 {
            ChangeKind::Added
        } else {
            ChangeKind::Removed
        };
        assert_eq!(*kind, expected, "notification {i} out of order");
    }
    assert!(log.lock().unwrap().iter().all(|c| c.id == first));
}

#[test]
fn unit_moved_to_another_port_is_matched_by_identity() {
    let backend = VirtualBackend::new();
    let original = backend.attach(STICK, "stick-serial-1");
    let enumerator = started(&backend);
    let id = enumerator.devices()[0].id;

    original.detach();
    wait_until("removal", || enumerator.connected_count() == 0);

    // Same unit, new locator.
    let moved = backend.attach(STICK, "stick-serial-1");
    wait_until("reconnect", || enumerator.connected_count() == 1);

    let info = enumerator.device_info(id).unwrap();
    assert!(info.alive);
    assert_eq!(info.locator, moved.locator());
    assert_eq!(enumerator.devices().len(), 1);
}

#[test]
fn distinct_units_never_share_an_id() {
    let backend = VirtualBackend::new();
    let enumerator = started(&backend);

    let a = backend.attach(STICK, "unit-a");
    wait_until("first unit", || enumerator.connected_count() == 1);
    let id_a = enumerator.devices()[0].id;
    a.detach();
    wait_until("first unit gone", || enumerator.connected_count() == 0);

    backend.attach(STICK, "unit-b");
    wait_until("second unit", || enumerator.connected_count() == 1);

    let devices = enumerator.devices();
    assert_eq!(devices.len(), 2);
    let id_b = devices.iter().find(|d| d.alive).unwrap().id;
    assert_ne!(id_a, id_b);
    assert!(id_b > id_a);
}

#[test]
fn same_identity_on_another_model_is_a_different_unit() {
    let backend = VirtualBackend::new();
    let stick = backend.attach(STICK, "shared-token");
    let enumerator = started(&backend);
    stick.detach();
    wait_until("removal", || enumerator.connected_count() == 0);

    backend.attach(PAD, "shared-token");
    wait_until("pad", || enumerator.connected_count() == 1);
    assert_eq!(enumerator.devices().len(), 2);
}

#[test]
fn units_without_identity_are_never_rematched() {
    let backend = VirtualBackend::new();
    let anonymous = backend.attach(OTHER, "");
    let enumerator = started(&backend);
    assert_eq!(enumerator.devices()[0].id, DeviceId(0));

    // Rescans while attached do not mint new ids.
    enumerator.rescan().unwrap();
    enumerator.start().unwrap();
    assert_eq!(enumerator.devices().len(), 1);

    anonymous.detach();
    wait_until("removal", || enumerator.connected_count() == 0);
    anonymous.reattach();
    wait_until("reattach", || enumerator.connected_count() == 1);

    let devices = enumerator.devices();
    assert_eq!(devices.len(), 2);
    assert!(!devices[0].alive);
    assert!(devices[1].alive);
    assert_eq!(devices[1].id, DeviceId(1));
}

#[test]
fn duplicate_announcements_are_ignored() {
    let backend = VirtualBackend::new();
    let stick = backend.attach(STICK, "stick-serial-1");
    let enumerator = started(&backend);
    let log = record(&enumerator);

    backend.announce(HotplugEvent::Arrived(RawDevice {
        descriptor: STICK,
        identity: DeviceIdentity::new("stick-serial-1"),
        locator: stick.locator(),
        meta: DeviceMeta::default(),
    }));
    // Monitor events are handled in order, so once this one lands the duplicate has too.
    backend.attach(OTHER, "other-1");
    wait_until("second device", || log.lock().unwrap().len() == 2);

    enumerator.rescan().unwrap();
    assert_eq!(enumerator.connected_count(), 2);
    assert_eq!(enumerator.devices().len(), 2);
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].descriptor, OTHER);
}
