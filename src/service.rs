//! The generic per-model device service.
//!
//! A [`DeviceService`] subscribes to an [`Enumerator`], keeps the ids of devices its
//! [`ModelProfile`] recognizes, and decodes their cached state into named values. Every
//! getter returns `None` for an id that is not currently one of this service's devices;
//! nothing is substituted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::decode::Pov;
use crate::device::DeviceId;
use crate::enumerator::Enumerator;
use crate::error::EnumeratorError;
use crate::event::{ChangeKind, DeviceStateChange};
use crate::eventbus::SubscriptionId;
use crate::profile::ModelProfile;
use crate::state::CachedState;

type IdList = Arc<Mutex<Vec<DeviceId>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DeviceService {
    enumerator: Arc<Enumerator>,
    profile: Arc<ModelProfile>,
    ids: IdList,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl DeviceService {
    pub fn new(enumerator: Arc<Enumerator>, profile: ModelProfile) -> Self {
        Self {
            enumerator,
            profile: Arc::new(profile),
            ids: Arc::default(),
            subscription: Mutex::new(None),
        }
    }

    /// Subscribe to the enumerator and start it if needed. Idempotent.
    ///
    /// On failure the service stays uninitialized and may be initialized again later.
    pub fn initialize(&self) -> Result<(), EnumeratorError> {
        let mut subscription = lock(&self.subscription);
        if subscription.is_some() {
            return Ok(());
        }

        let profile = Arc::clone(&self.profile);
        let ids = Arc::clone(&self.ids);
        let id = self
            .enumerator
            .subscribe(move |change| accept(&profile, &ids, change));

        if let Err(e) = self.enumerator.start() {
            self.enumerator.unsubscribe(id);
            lock(&self.ids).clear();
            return Err(e);
        }
        *subscription = Some(id);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        lock(&self.subscription).is_some()
    }

    pub fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    pub fn enumerator(&self) -> &Arc<Enumerator> {
        &self.enumerator
    }

    /// Ids of this model's connected devices, in the order they arrived.
    pub fn ids(&self) -> Vec<DeviceId> {
        lock(&self.ids).clone()
    }

    pub fn connected_count(&self) -> usize {
        lock(&self.ids).len()
    }

    pub fn is_valid_id(&self, id: DeviceId) -> bool {
        lock(&self.ids).contains(&id)
    }

    /// Drain the device's pending input and return its cached state.
    ///
    /// `None` if `id` is not valid, including when the drain itself finds the device gone.
    pub fn snapshot(&self, id: DeviceId) -> Option<CachedState> {
        if !self.is_valid_id(id) {
            return None;
        }
        let state = self.enumerator.raw_state(id)?;
        // A read failure during the drain removes the id before we get here.
        self.is_valid_id(id).then_some(state)
    }

    /// Logical value of the named axis. An axis that has not reported yet reads 0.
    pub fn axis(&self, id: DeviceId, name: &str) -> Option<i32> {
        let state = self.snapshot(id)?;
        self.axis_in(&state, name)
    }

    pub fn button(&self, id: DeviceId, name: &str) -> Option<bool> {
        let state = self.snapshot(id)?;
        self.button_in(&state, name)
    }

    pub fn pov(&self, id: DeviceId) -> Option<Pov> {
        let state = self.snapshot(id)?;
        self.pov_in(&state)
    }

    /// Decode a named axis from an already-taken snapshot.
    pub fn axis_in(&self, state: &CachedState, name: &str) -> Option<i32> {
        let spec = self.profile.axis(name)?;
        Some(state.axis(spec.code).map_or(0, |raw| spec.normalize(raw)))
    }

    pub fn button_in(&self, state: &CachedState, name: &str) -> Option<bool> {
        let spec = self.profile.button(name)?;
        Some(state.button(spec.code))
    }

    /// `None` if the model has no hat.
    pub fn pov_in(&self, state: &CachedState) -> Option<Pov> {
        self.profile.hat.then(|| state.pov())
    }
}

impl Drop for DeviceService {
    fn drop(&mut self) {
        if let Some(id) = lock(&self.subscription).take() {
            self.enumerator.unsubscribe(id);
        }
    }
}

fn accept(profile: &ModelProfile, ids: &Mutex<Vec<DeviceId>>, change: &DeviceStateChange) {
    if !profile.recognizes(&change.descriptor) {
        return;
    }
    let mut ids = lock(ids);
    match change.kind {
        ChangeKind::Added => {
            if !ids.contains(&change.id) {
                ids.push(change.id);
                debug!(model = %profile.name, id = %change.id, "device accepted");
            }
        }
        ChangeKind::Removed => {
            if let Some(pos) = ids.iter().position(|&id| id == change.id) {
                ids.remove(pos);
                debug!(model = %profile.name, id = %change.id, "device released");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceDescriptor;
    use crate::profile::{AxisSpec, ButtonSpec};

    fn profile() -> ModelProfile {
        ModelProfile {
            name: "Test".into(),
            descriptors: vec![DeviceDescriptor::new(1, 2)],
            axes: vec![AxisSpec::new("x", 0, 0, 100)],
            buttons: vec![ButtonSpec::new("fire", 0x120)],
            hat: false,
            hid_report: None,
        }
    }

    #[test]
    fn accept_filters_and_dedupes() {
        let profile = profile();
        let ids = Mutex::new(Vec::new());
        let ours = DeviceDescriptor::new(1, 2);
        let theirs = DeviceDescriptor::new(1, 3);

        accept(&profile, &ids, &DeviceStateChange::added(DeviceId(0), theirs));
        accept(&profile, &ids, &DeviceStateChange::added(DeviceId(1), ours));
        accept(&profile, &ids, &DeviceStateChange::added(DeviceId(1), ours));
        accept(&profile, &ids, &DeviceStateChange::added(DeviceId(2), ours));
        assert_eq!(*ids.lock().unwrap(), [DeviceId(1), DeviceId(2)]);

        accept(&profile, &ids, &DeviceStateChange::removed(DeviceId(1), ours));
        accept(&profile, &ids, &DeviceStateChange::removed(DeviceId(7), ours));
        assert_eq!(*ids.lock().unwrap(), [DeviceId(2)]);
    }
}
