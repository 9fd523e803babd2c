#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use joylink::{
    DeviceDescriptor, DeviceStateChange, Enumerator, EnumeratorConfig, VirtualBackend,
};

pub const STICK: DeviceDescriptor = DeviceDescriptor::new(0x046d, 0xc215);
pub const PAD: DeviceDescriptor = DeviceDescriptor::new(0x045e, 0x028e);
pub const OTHER: DeviceDescriptor = DeviceDescriptor::new(0x1234, 0x5678);

const WAIT: Duration = Duration::from_secs(5);

/// Poll `cond` until it holds, panicking after a generous timeout.
pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

pub fn started(backend: &VirtualBackend) -> Arc<Enumerator> {
    let enumerator = Arc::new(Enumerator::new(backend.clone(), EnumeratorConfig::default()));
    enumerator.start().unwrap();
    enumerator
}

/// Subscribe a recorder and return the shared log it appends to.
pub fn record(enumerator: &Enumerator) -> Arc<Mutex<Vec<DeviceStateChange>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    enumerator.subscribe(move |change| sink.lock().unwrap().push(*change));
    log
}
