//! The device table: one record per physical unit ever seen, indexed by [`DeviceId`].
//!
//! Records are never removed while the enumerator runs. A detached unit stays in the
//! table as a *dormant* record (no handle, identity kept) so a later reconnect can be
//! matched back to its original id. Ids are dense and handed out by a counter, so the
//! table is a plain arena: `records[id.0]`.
//!
//! Every mutation that subscribers must hear about pushes a [`DeviceStateChange`] onto
//! `pending`. The queue is filled under the table lock in mutation order and emptied by
//! the enumerator's dispatcher, which is what keeps per-device notifications ordered.

use std::collections::VecDeque;

use tracing::{debug, info, trace};

use crate::device::{
    DeviceDescriptor, DeviceHandle, DeviceId, DeviceIdentity, Presence, RawDevice, ReadError,
};
use crate::event::{DeviceStateChange, RawEvent};
use crate::metadata::DeviceMeta;
use crate::state::CachedState;

/// One tracked physical unit, live or dormant.
pub(crate) struct DeviceRecord {
    pub id: DeviceId,
    pub descriptor: DeviceDescriptor,
    pub identity: DeviceIdentity,
    /// Backend address of the most recent attachment.
    pub locator: String,
    pub meta: DeviceMeta,
    pub state: CachedState,
    /// `Some` exactly while the record is alive.
    handle: Option<DeviceHandle>,
}

impl DeviceRecord {
    pub fn alive(&self) -> bool {
        self.handle.is_some()
    }
}

/// What [`DeviceTable::admit`] did with an observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    /// A dormant record matched; it is alive again under its old id.
    Rematched(DeviceId),
    /// The unit is already tracked and alive; the new handle was dropped.
    Duplicate(DeviceId),
    /// First sighting; a new record was created.
    Inserted(DeviceId),
}

/// Outcome of draining a device's pending input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Refresh {
    Live(CachedState),
    /// The read confirmed the device is gone. It is now dormant.
    Lost,
    /// The id is unknown or already dormant.
    NotAlive,
}

/// Bounds applied to one drain.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DrainLimits {
    pub max_events: usize,
    pub busy_retries: u32,
}

#[derive(Default)]
pub(crate) struct DeviceTable {
    records: Vec<DeviceRecord>,
    connected: usize,
    pending: VecDeque<DeviceStateChange>,
}

impl DeviceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: DeviceId) -> Option<&DeviceRecord> {
        self.records.get(id.0 as usize)
    }

    pub fn records(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.records.iter()
    }

    pub fn connected(&self) -> usize {
        self.connected
    }

    pub fn alive_ids(&self) -> impl Iterator<Item = (DeviceId, DeviceDescriptor)> + '_ {
        self.records
            .iter()
            .filter(|r| r.alive())
            .map(|r| (r.id, r.descriptor))
    }

    /// An alive record that already covers `raw`: same locator, or same known identity and
    /// descriptor.
    pub fn find_alive_duplicate(&self, raw: &RawDevice) -> Option<DeviceId> {
        self.records
            .iter()
            .filter(|r| r.alive())
            .find(|r| {
                r.locator == raw.locator
                    || (r.descriptor == raw.descriptor && r.identity.matches(&raw.identity))
            })
            .map(|r| r.id)
    }

    /// `raw` is not tracked alive, but a dormant record was last seen at its locator or
    /// carries its identity.
    pub fn awaits_readmission(&self, raw: &RawDevice) -> bool {
        self.find_alive_duplicate(raw).is_none()
            && self.records.iter().any(|r| {
                !r.alive()
                    && (r.locator == raw.locator
                        || (r.descriptor == raw.descriptor && r.identity.matches(&raw.identity)))
            })
    }

    fn find_dormant_match(&self, raw: &RawDevice) -> Option<DeviceId> {
        self.records
            .iter()
            .filter(|r| !r.alive())
            .find(|r| r.descriptor == raw.descriptor && r.identity.matches(&raw.identity))
            .map(|r| r.id)
    }

    /// Decide whether `raw` is a reconnect, a duplicate, or a new unit, and record it.
    ///
    /// `seed` is the handle's initial state; it replaces whatever the record cached before.
    pub fn admit(&mut self, raw: RawDevice, handle: DeviceHandle, seed: &[RawEvent]) -> Admission {
        if let Some(id) = self.find_alive_duplicate(&raw) {
            trace!(%id, locator = %raw.locator, "duplicate announcement, dropping new handle");
            return Admission::Duplicate(id);
        }

        let mut state = CachedState::default();
        state.apply_all(seed);

        if let Some(id) = self.find_dormant_match(&raw) {
            let record = &mut self.records[id.0 as usize];
            record.locator = raw.locator;
            record.meta = raw.meta;
            record.state = state;
            record.handle = Some(handle);
            self.connected += 1;
            self.pending
                .push_back(DeviceStateChange::added(id, record.descriptor));
            info!(%id, descriptor = %record.descriptor, identity = %record.identity, "device reconnected");
            return Admission::Rematched(id);
        }

        let id = DeviceId(self.records.len() as u32);
        info!(%id, descriptor = %raw.descriptor, identity = %raw.identity, locator = %raw.locator, "device added");
        self.pending
            .push_back(DeviceStateChange::added(id, raw.descriptor));
        self.records.push(DeviceRecord {
            id,
            descriptor: raw.descriptor,
            identity: raw.identity,
            locator: raw.locator,
            meta: raw.meta,
            state,
            handle: Some(handle),
        });
        self.connected += 1;
        Admission::Inserted(id)
    }

    /// Alive → dormant. Closes the handle and queues `Removed`. No-op if not alive.
    pub fn retire(&mut self, id: DeviceId) -> bool {
        let Some(record) = self.records.get_mut(id.0 as usize) else {
            return false;
        };
        if record.handle.take().is_none() {
            return false;
        }
        record.state = CachedState::default();
        self.connected -= 1;
        self.pending
            .push_back(DeviceStateChange::removed(id, record.descriptor));
        info!(%id, descriptor = %record.descriptor, "device removed");
        true
    }

    /// Probe the handle and retire the record only on confirmed loss.
    pub fn confirm_loss(&mut self, id: DeviceId) -> bool {
        let presence = match self
            .records
            .get_mut(id.0 as usize)
            .and_then(|r| r.handle.as_mut())
        {
            Some(handle) => handle.probe(),
            None => return false,
        };
        match presence {
            Presence::Gone => self.retire(id),
            Presence::Present => false,
            Presence::Unknown => {
                debug!(%id, "liveness unknown, keeping device alive");
                false
            }
        }
    }

    /// Alive ids whose current locator is `locator`.
    pub fn alive_at(&self, locator: &str) -> Vec<DeviceId> {
        self.records
            .iter()
            .filter(|r| r.alive() && r.locator == locator)
            .map(|r| r.id)
            .collect()
    }

    /// Drain pending input for `id` into its cached state and return a copy.
    ///
    /// `Busy` reads are retried up to `busy_retries` times, then treated as loss.
    pub fn refresh(&mut self, id: DeviceId, limits: DrainLimits) -> Refresh {
        let Some(record) = self.records.get_mut(id.0 as usize) else {
            return Refresh::NotAlive;
        };
        let Some(handle) = record.handle.as_mut() else {
            return Refresh::NotAlive;
        };

        let mut events = Vec::new();
        let mut busy = 0u32;
        let lost = loop {
            events.clear();
            let result = handle.read_pending(&mut events, limits.max_events);
            record.state.apply_all(&events);
            match result {
                Ok(()) => break false,
                Err(ReadError::Gone) => break true,
                Err(ReadError::Busy) => {
                    busy += 1;
                    if busy > limits.busy_retries {
                        debug!(%id, retries = limits.busy_retries, "read kept failing, treating as lost");
                        break true;
                    }
                    trace!(%id, attempt = busy, "device busy, retrying read");
                }
            }
        };

        if lost {
            self.retire(id);
            Refresh::Lost
        } else {
            Refresh::Live(record.state.clone())
        }
    }

    pub fn take_pending(&mut self) -> Vec<DeviceStateChange> {
        self.pending.drain(..).collect()
    }

    /// Close every open handle. Records are discarded.
    pub fn clear(&mut self) {
        self.records.clear();
        self.connected = 0;
        self.pending.clear();
    }
}
