//! Point-in-time views of the device table.
//!
//! [`DeviceInfo`] describes one record (alive or dormant) without its handle. [`Snapshot`]
//! is an **owned**, read-only view of every alive device's info and cached state, produced
//! by [`Enumerator::snapshot`](crate::enumerator::Enumerator::snapshot). It is cheap to
//! clone for fan-out and serializes to JSON for diagnostics.
//!
//! # Examples
//! ```no_run
//! use joylink::snapshot::Snapshot;
//!
//! fn print_axes(snap: &Snapshot) {
//!     for (info, state) in snap.iter() {
//!         println!("{} {}: x={:?} trigger={}",
//!                  info.id, info.meta.display_name(), state.axis(0), state.button(0x120));
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::device::{DeviceDescriptor, DeviceId, DeviceIdentity};
use crate::metadata::DeviceMeta;
use crate::state::CachedState;
use crate::table::DeviceRecord;

/// Handle-free description of one device record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub alive: bool,
    pub descriptor: DeviceDescriptor,
    pub identity: DeviceIdentity,
    /// Backend address of the most recent attachment.
    pub locator: String,
    pub meta: DeviceMeta,
}

impl DeviceInfo {
    pub(crate) fn from_record(record: &DeviceRecord) -> Self {
        Self {
            id: record.id,
            alive: record.alive(),
            descriptor: record.descriptor,
            identity: record.identity.clone(),
            locator: record.locator.clone(),
            meta: record.meta.clone(),
        }
    }
}

/// One alive device in a [`Snapshot`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceSnapshot {
    pub info: DeviceInfo,
    pub state: CachedState,
}

/// Owned snapshot of alive devices, keyed by id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot(BTreeMap<DeviceId, DeviceSnapshot>);

impl Snapshot {
    pub(crate) fn insert(&mut self, info: DeviceInfo, state: CachedState) {
        self.0.insert(info.id, DeviceSnapshot { info, state });
    }

    #[inline]
    pub fn get(&self, id: DeviceId) -> Option<&DeviceSnapshot> {
        self.0.get(&id)
    }

    /// Iterate `(info, state)` pairs in id order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceInfo, &CachedState)> {
        self.0.values().map(|d| (&d.info, &d.state))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the snapshot and return the inner map.
    #[inline]
    pub fn into_inner(self) -> BTreeMap<DeviceId, DeviceSnapshot> {
        self.0
    }

    /// Pretty-printed JSON, for logs and bug reports.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.0.values().collect::<Vec<_>>())
    }
}
