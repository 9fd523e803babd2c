mod common;

use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use common::{record, started, wait_until, PAD, STICK};
use joylink::codes::{ABS_X, BTN_JOYSTICK};
use joylink::{
    CachedState, ChangeKind, DeviceDescriptor, DeviceId, Enumerator, EnumeratorConfig,
    HotplugEvent, Presence, ReadError, VirtualBackend,
};

#[test]
fn read_failure_removes_the_device_inline() {
    let backend = VirtualBackend::new();
    let stick = backend.attach(STICK, "stick-1");
    let enumerator = started(&backend);
    let log = record(&enumerator);
    let id = DeviceId(0);

    stick.set_axis(ABS_X, 700);
    assert_eq!(enumerator.raw_state(id).unwrap().axis(ABS_X), Some(700));

    stick.fail_reads(ReadError::Gone, 1);
    assert_eq!(enumerator.raw_state(id), Some(CachedState::default()));
    // Removed was delivered before raw_state returned.
    let kinds: Vec<ChangeKind> = log.lock().unwrap().iter().map(|c| c.kind).collect();
    assert_eq!(kinds, [ChangeKind::Added, ChangeKind::Removed]);
    assert_eq!(enumerator.connected_count(), 0);
    assert_eq!(enumerator.raw_state(id), None);

    // The record kept its identity.
    let info = enumerator.device_info(id).unwrap();
    assert!(!info.alive);
    assert_eq!(info.identity.as_str(), "stick-1");
}

#[test]
fn busy_reads_are_retried() {
    let backend = VirtualBackend::new();
    let stick = backend.attach(STICK, "stick-1");
    let config = EnumeratorConfig {
        read_retries: 3,
        ..EnumeratorConfig::default()
    };
    let enumerator = Enumerator::new(backend.clone(), config);
    enumerator.start().unwrap();
    let id = DeviceId(0);

    stick.press_button(BTN_JOYSTICK);
    stick.fail_reads(ReadError::Busy, 3);
    let state = enumerator.raw_state(id).unwrap();
    assert!(state.button(BTN_JOYSTICK));
    assert_eq!(enumerator.connected_count(), 1);
}

#[test]
fn persistent_busy_reads_escalate_to_removal() {
    let backend = VirtualBackend::new();
    let stick = backend.attach(STICK, "stick-1");
    let config = EnumeratorConfig {
        read_retries: 2,
        ..EnumeratorConfig::default()
    };
    let enumerator = Enumerator::new(backend.clone(), config);
    enumerator.start().unwrap();

    stick.fail_reads(ReadError::Busy, 3);
    assert_eq!(enumerator.raw_state(DeviceId(0)), Some(CachedState::default()));
    assert_eq!(enumerator.connected_count(), 0);

    // Still physically attached: the next announcement brings it back under the same id.
    backend.announce(HotplugEvent::Rescan);
    wait_until("re-enumeration", || enumerator.connected_count() == 1);
    assert_eq!(enumerator.devices().len(), 1);
}

#[test]
fn unconfirmed_departures_keep_the_device() {
    let backend = VirtualBackend::new();
    let stick = backend.attach(STICK, "stick-1");
    let enumerator = started(&backend);
    let log = record(&enumerator);

    stick.override_probe(Some(Presence::Unknown));
    backend.announce(HotplugEvent::Departed {
        locator: stick.locator(),
    });
    backend.announce(HotplugEvent::ProbeAll);
    // Flush the monitor queue with an event we can observe.
    backend.attach(PAD, "pad-1");
    wait_until("pad", || log.lock().unwrap().len() == 2);

    assert_eq!(enumerator.connected_count(), 2);
    assert!(log.lock().unwrap().iter().all(|c| c.kind == ChangeKind::Added));
}

#[test]
fn probe_all_retires_silently_detached_devices() {
    let backend = VirtualBackend::new();
    let stick = backend.attach(STICK, "stick-1");
    backend.attach(PAD, "pad-1");
    let enumerator = started(&backend);

    stick.detach_silently();
    backend.announce(HotplugEvent::ProbeAll);
    wait_until("stick retired", || enumerator.connected_count() == 1);
    let alive: Vec<DeviceId> = enumerator
        .devices()
        .into_iter()
        .filter(|d| d.alive)
        .map(|d| d.id)
        .collect();
    assert_eq!(alive, [DeviceId(1)]);
}

#[test]
fn concurrent_queries_see_whole_states_during_removal() {
    const READERS: usize = 8;

    let backend = VirtualBackend::new();
    let stick = backend.attach(STICK, "stick-1");
    let enumerator = started(&backend);
    let id = DeviceId(0);

    stick.set_axis(ABS_X, 321);
    stick.press_button(BTN_JOYSTICK);
    let before = enumerator.raw_state(id).unwrap();
    assert_eq!(before.axis(ABS_X), Some(321));

    let barrier = Arc::new(Barrier::new(READERS + 1));
    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let enumerator = Arc::clone(&enumerator);
            let barrier = Arc::clone(&barrier);
            let before = before.clone();
            thread::spawn(move || {
                barrier.wait();
                let deadline = Instant::now() + Duration::from_secs(5);
                loop {
                    match enumerator.raw_state(id) {
                        Some(state) if state == before => {}
                        Some(state) => assert_eq!(state, CachedState::default()),
                        None => break,
                    }
                    assert!(Instant::now() < deadline, "device never went away");
                }
            })
        })
        .collect();

    barrier.wait();
    stick.detach();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(enumerator.connected_count(), 0);
}

#[test]
fn shutdown_stops_detection_and_invalidates_ids() {
    let backend = VirtualBackend::new();
    backend.attach(STICK, "stick-1");
    let enumerator = started(&backend);
    let log = record(&enumerator);
    assert!(enumerator.is_running());

    let begun = Instant::now();
    enumerator.shutdown();
    assert!(begun.elapsed() < Duration::from_secs(1));
    assert!(!enumerator.is_running());
    assert_eq!(enumerator.connected_count(), 0);
    assert_eq!(enumerator.raw_state(DeviceId(0)), None);
    assert!(enumerator.devices().is_empty());

    backend.attach(PAD, "pad-1");
    thread::sleep(Duration::from_millis(50));
    assert_eq!(log.lock().unwrap().len(), 1);

    // Idempotent.
    enumerator.shutdown();
}

#[test]
fn subscribers_may_call_back_into_the_enumerator() {
    let backend = VirtualBackend::new();
    let enumerator = started(&backend);
    let counts = Arc::new(std::sync::Mutex::new(Vec::new()));
    {
        let weak = Arc::downgrade(&enumerator);
        let counts = Arc::clone(&counts);
        enumerator.subscribe(move |change| {
            if let Some(e) = weak.upgrade() {
                counts.lock().unwrap().push((change.kind, e.connected_count()));
                e.device_info(change.id);
            }
        });
    }

    let stick = backend.attach(STICK, "stick-1");
    wait_until("added", || counts.lock().unwrap().len() == 1);
    stick.detach();
    wait_until("removed", || counts.lock().unwrap().len() == 2);
    assert_eq!(
        *counts.lock().unwrap(),
        [(ChangeKind::Added, 1), (ChangeKind::Removed, 0)]
    );
}

#[test]
fn removal_found_during_replay_reaches_every_subscriber() {
    let backend = VirtualBackend::new();
    let stick = backend.attach(STICK, "stick-1");
    let enumerator = started(&backend);
    let first = record(&enumerator);

    stick.fail_reads(ReadError::Gone, 1);
    let second = Arc::new(Mutex::new(Vec::new()));
    {
        let weak = Arc::downgrade(&enumerator);
        let second = Arc::clone(&second);
        enumerator.subscribe(move |change| {
            second.lock().unwrap().push(change.kind);
            if let Some(e) = weak.upgrade() {
                e.raw_state(change.id);
            }
        });
    }

    assert_eq!(enumerator.connected_count(), 0);
    let kinds: Vec<ChangeKind> = first.lock().unwrap().iter().map(|c| c.kind).collect();
    assert_eq!(kinds, [ChangeKind::Added, ChangeKind::Removed]);
    assert_eq!(
        *second.lock().unwrap(),
        [ChangeKind::Added, ChangeKind::Removed]
    );
}

#[test]
fn monitor_errors_do_not_stop_detection() {
    let backend = VirtualBackend::new();
    backend.fail_next_waits(1);
    let config = EnumeratorConfig {
        error_backoff_ms: 10,
        ..EnumeratorConfig::default()
    };
    let enumerator = Enumerator::new(backend.clone(), config);
    enumerator.start().unwrap();

    let stick = backend.attach(STICK, "stick-1");
    wait_until("stick after monitor error", || enumerator.connected_count() == 1);

    backend.fail_next_waits(2);
    backend.attach(PAD, "pad-1");
    stick.detach();
    wait_until("pad and stick departure", || {
        enumerator.devices().len() == 2 && enumerator.connected_count() == 1
    });
    assert!(enumerator.is_running());
}

#[test]
fn panicking_subscriber_does_not_stop_detection() {
    let backend = VirtualBackend::new();
    let enumerator = started(&backend);
    let log = record(&enumerator);
    enumerator.subscribe(|change| {
        if change.kind == ChangeKind::Added && change.descriptor == STICK {
            panic!("subscriber failure");
        }
    });

    let stick = backend.attach(STICK, "stick-1");
    wait_until("stick", || log.lock().unwrap().len() == 1);
    backend.attach(PAD, "pad-1");
    stick.detach();
    wait_until("pad and stick departure", || log.lock().unwrap().len() == 3);

    let seen: Vec<(ChangeKind, DeviceDescriptor)> = log
        .lock()
        .unwrap()
        .iter()
        .map(|c| (c.kind, c.descriptor))
        .collect();
    assert_eq!(
        seen,
        [
            (ChangeKind::Added, STICK),
            (ChangeKind::Added, PAD),
            (ChangeKind::Removed, STICK),
        ]
    );
    assert_eq!(enumerator.connected_count(), 1);
}
