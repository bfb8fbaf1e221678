//! Plugin slot registry.
//!
//! A fixed-capacity table indexed by slot id. Control-thread mutations build
//! a fresh snapshot and publish it with an atomic pointer swap; the audio
//! thread reads whichever snapshot was current at the top of its cycle.
//! Retired snapshots are kept alive until the audio thread's generation
//! counter proves it has moved on, then dropped on the control thread.

use crate::client::Client;
use crate::config::PluginType;
use crate::error::{Error, Result};
use crate::lockfree::{AtomicFlag, Generation, PeakMeter};
use arc_swap::ArcSwap;
use attacca_plugin::{PluginInstance, PortCounts};
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

pub type PluginId = u32;

/// Lifecycle state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Uninitialised = 0,
    Initialising = 1,
    Ready = 2,
    Replacing = 3,
    Removing = 4,
}

impl SlotState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SlotState::Initialising,
            2 => SlotState::Ready,
            3 => SlotState::Replacing,
            4 => SlotState::Removing,
            _ => SlotState::Uninitialised,
        }
    }
}

/// What a slot was loaded from; snapshotted into projects.
#[derive(Debug, Clone, Default)]
pub struct SlotOrigin {
    pub kind: PluginType,
    pub filename: Option<String>,
}

/// One registry entry: a plugin instance plus its host-side bookkeeping.
pub struct PluginSlot {
    id: AtomicU32,
    name: Mutex<String>,
    name_index: AtomicU32,
    state: AtomicU8,
    /// Cleared when the audio thread quarantines the plugin after a fault.
    enabled: AtomicFlag,
    /// MIDI channels this slot listens on in rack mode (bit per channel).
    midi_channel_mask: AtomicU16,
    latency: AtomicU32,
    port_counts: PortCounts,
    origin: SlotOrigin,
    pub peaks: PeakMeter,
    instance: Mutex<Box<dyn PluginInstance>>,
    client: UnsafeCell<Client>,
}

// SAFETY: `client` is behind an UnsafeCell with a strict access protocol:
// the audio thread touches it only for slots present in the active snapshot,
// and the control thread only while the slot is hidden from the snapshot
// (Initialising, or Removing after the generation counter proves the audio
// thread has let go). Every other field is atomics or mutex-guarded.
unsafe impl Send for PluginSlot {}
unsafe impl Sync for PluginSlot {}

impl PluginSlot {
    fn new(
        id: PluginId,
        name: String,
        origin: SlotOrigin,
        instance: Box<dyn PluginInstance>,
        client: Client,
    ) -> Self {
        let port_counts = instance.port_counts();
        Self {
            id: AtomicU32::new(id),
            name: Mutex::new(name),
            name_index: AtomicU32::new(crate::mailbox::NO_STRING),
            state: AtomicU8::new(SlotState::Initialising as u8),
            enabled: AtomicFlag::new(true),
            midi_channel_mask: AtomicU16::new(u16::MAX),
            latency: AtomicU32::new(0),
            port_counts,
            origin,
            peaks: PeakMeter::new(),
            instance: Mutex::new(instance),
            client: UnsafeCell::new(client),
        }
    }

    pub fn origin(&self) -> &SlotOrigin {
        &self.origin
    }

    pub fn id(&self) -> PluginId {
        self.id.load(Ordering::Acquire)
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub(crate) fn set_name(&self, name: String) {
        *self.name.lock() = name;
    }

    pub fn name_index(&self) -> u32 {
        self.name_index.load(Ordering::Acquire)
    }

    pub(crate) fn set_name_index(&self, index: u32) {
        self.name_index.store(index, Ordering::Release);
    }

    pub fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: SlotState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Audio thread: quarantine after a processing fault.
    pub(crate) fn disable(&self) {
        self.enabled.set(false);
    }

    pub fn midi_channel_mask(&self) -> u16 {
        self.midi_channel_mask.load(Ordering::Acquire)
    }

    pub fn set_midi_channel_mask(&self, mask: u16) {
        self.midi_channel_mask.store(mask, Ordering::Release);
    }

    pub fn latency(&self) -> u32 {
        self.latency.load(Ordering::Acquire)
    }

    pub(crate) fn set_latency(&self, samples: u32) {
        self.latency.store(samples, Ordering::Release);
    }

    /// Port counts captured at load time; control-side graph validation uses
    /// these instead of touching the live client.
    pub fn port_counts(&self) -> PortCounts {
        self.port_counts
    }

    /// The plugin instance. Control-thread callers block at most one audio
    /// block; the audio thread itself only ever uses [`Self::try_instance`].
    pub fn instance(&self) -> parking_lot::MutexGuard<'_, Box<dyn PluginInstance>> {
        self.instance.lock()
    }

    /// Non-blocking instance access for the audio thread. `None` means a
    /// control operation holds the plugin this cycle; the caller renders
    /// silence instead of waiting.
    pub(crate) fn try_instance(
        &self,
    ) -> Option<parking_lot::MutexGuard<'_, Box<dyn PluginInstance>>> {
        self.instance.try_lock()
    }

    /// Audio-thread access to the port group.
    ///
    /// SAFETY: caller must be the audio thread, holding the active snapshot
    /// this slot came from.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn client_rt(&self) -> &mut Client {
        &mut *self.client.get()
    }

    /// Shared audio-thread view of another slot's ports (reading an
    /// upstream plugin's output buffers).
    ///
    /// SAFETY: as [`Self::client_rt`], and the caller must not hold a
    /// mutable borrow of this same slot's client.
    pub(crate) unsafe fn client_rt_ref(&self) -> &Client {
        &*self.client.get()
    }

    /// Control-thread access to the port group while the slot is hidden
    /// from the active snapshot.
    ///
    /// SAFETY: caller must guarantee the slot is not in any snapshot the
    /// audio thread may still hold.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn client_control(&self) -> &mut Client {
        &mut *self.client.get()
    }
}

/// Immutable table the audio thread processes from.
pub struct Snapshot {
    slots: Vec<Option<Arc<PluginSlot>>>,
}

impl Snapshot {
    fn empty(capacity: u32) -> Self {
        Self {
            slots: vec![None; capacity as usize],
        }
    }

    /// Slots in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (PluginId, &Arc<PluginSlot>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|s| (id as PluginId, s)))
    }

    pub fn get(&self, id: PluginId) -> Option<&Arc<PluginSlot>> {
        self.slots.get(id as usize).and_then(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }
}

/// Fixed-capacity slot table with RCU-style publication.
pub struct Registry {
    capacity: u32,
    slots: Mutex<Vec<Option<Arc<PluginSlot>>>>,
    active: ArcSwap<Snapshot>,
    generation: Arc<Generation>,
    retired: Mutex<Vec<(u64, Arc<Snapshot>)>>,
}

impl Registry {
    pub fn new(capacity: u32, generation: Arc<Generation>) -> Self {
        Self {
            capacity,
            slots: Mutex::new(vec![None; capacity as usize]),
            active: ArcSwap::from_pointee(Snapshot::empty(capacity)),
            generation,
            retired: Mutex::new(Vec::new()),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn count(&self) -> u32 {
        self.slots.lock().iter().filter(|s| s.is_some()).count() as u32
    }

    /// Ids currently in use, ascending.
    pub fn ids(&self) -> Vec<PluginId> {
        self.slots
            .lock()
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|_| id as PluginId))
            .collect()
    }

    pub fn get(&self, id: PluginId) -> Result<Arc<PluginSlot>> {
        self.slots
            .lock()
            .get(id as usize)
            .and_then(|s| s.clone())
            .ok_or(Error::SlotEmpty(id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<PluginSlot>> {
        self.slots
            .lock()
            .iter()
            .flatten()
            .find(|slot| slot.name() == name)
            .cloned()
    }

    /// `base` if free, otherwise `base (N)` with the smallest free N >= 2.
    /// Comparison is byte-exact.
    pub fn unique_name(&self, base: &str) -> String {
        let slots = self.slots.lock();
        let taken = |candidate: &str| slots.iter().flatten().any(|s| s.name() == candidate);
        if !taken(base) {
            return base.to_owned();
        }
        let mut n = 2u32;
        loop {
            let candidate = format!("{base} ({n})");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Reserve the lowest free slot for a loading plugin. The slot is not
    /// visible to the audio thread until [`Self::commit`].
    pub fn reserve(
        &self,
        name: String,
        origin: SlotOrigin,
        instance: Box<dyn PluginInstance>,
        client: Client,
    ) -> Result<Arc<PluginSlot>> {
        let mut slots = self.slots.lock();
        let id = slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(Error::SlotFull(self.capacity))? as PluginId;
        let slot = Arc::new(PluginSlot::new(id, name, origin, instance, client));
        slots[id as usize] = Some(slot.clone());
        Ok(slot)
    }

    /// Reserve a specific id (replace flow). The previous occupant must
    /// already be gone.
    pub fn reserve_at(
        &self,
        id: PluginId,
        name: String,
        origin: SlotOrigin,
        instance: Box<dyn PluginInstance>,
        client: Client,
    ) -> Result<Arc<PluginSlot>> {
        let mut slots = self.slots.lock();
        let entry = slots
            .get_mut(id as usize)
            .ok_or(Error::InvalidArgument(format!("slot id {id} out of range")))?;
        if entry.is_some() {
            return Err(Error::InvalidArgument(format!("slot {id} still occupied")));
        }
        let slot = Arc::new(PluginSlot::new(id, name, origin, instance, client));
        *entry = Some(slot.clone());
        Ok(slot)
    }

    /// Make a reserved slot processable and publish a new snapshot.
    /// Returns the retired snapshot's generation tag.
    pub fn commit(&self, id: PluginId) -> Result<u64> {
        let slot = self.get(id)?;
        slot.set_state(SlotState::Ready);
        Ok(self.publish())
    }

    /// Abandon a reserved slot that never became ready.
    pub fn cancel(&self, id: PluginId) {
        let mut slots = self.slots.lock();
        if let Some(entry) = slots.get_mut(id as usize) {
            if let Some(slot) = entry {
                if slot.state() == SlotState::Initialising {
                    *entry = None;
                }
            }
        }
    }

    /// Hide a slot from the audio thread and drop it from the table.
    ///
    /// The returned slot stays alive through retired snapshots until the
    /// audio generation passes the returned tag; only then may the caller
    /// touch its client or tear the instance down.
    pub fn begin_remove(&self, id: PluginId) -> Result<(Arc<PluginSlot>, u64)> {
        let slot = {
            let mut slots = self.slots.lock();
            let entry = slots
                .get_mut(id as usize)
                .ok_or(Error::SlotEmpty(id))?
                .take()
                .ok_or(Error::SlotEmpty(id))?;
            entry
        };
        slot.set_state(SlotState::Removing);
        let retired_at = self.publish();
        Ok((slot, retired_at))
    }

    /// Swap two slots' positions. Observers see either the before or the
    /// after table, never a mix.
    pub fn switch(&self, a: PluginId, b: PluginId) -> Result<u64> {
        {
            let mut slots = self.slots.lock();
            let len = slots.len();
            if a as usize >= len {
                return Err(Error::SlotEmpty(a));
            }
            if b as usize >= len {
                return Err(Error::SlotEmpty(b));
            }
            if slots[a as usize].is_none() {
                return Err(Error::SlotEmpty(a));
            }
            if slots[b as usize].is_none() {
                return Err(Error::SlotEmpty(b));
            }
            slots.swap(a as usize, b as usize);
            if let Some(slot) = &slots[a as usize] {
                slot.id.store(a, Ordering::Release);
            }
            if let Some(slot) = &slots[b as usize] {
                slot.id.store(b, Ordering::Release);
            }
        }
        Ok(self.publish())
    }

    /// Rebuild and swap in the active snapshot from the master table.
    /// Returns the generation at which the previous snapshot retired.
    pub fn publish(&self) -> u64 {
        let snapshot = {
            let slots = self.slots.lock();
            let visible = slots
                .iter()
                .map(|entry| {
                    entry.as_ref().and_then(|slot| {
                        match slot.state() {
                            SlotState::Ready | SlotState::Replacing => Some(slot.clone()),
                            _ => None,
                        }
                    })
                })
                .collect();
            Arc::new(Snapshot { slots: visible })
        };
        let previous = self.active.swap(snapshot);
        let retired_at = self.generation.current();
        self.retired.lock().push((retired_at, previous));
        retired_at
    }

    /// Audio-thread view of the table. An Arc clone, no locks.
    pub fn rt_snapshot(&self) -> Arc<Snapshot> {
        self.active.load_full()
    }

    /// Drop retired snapshots the audio thread has provably let go of.
    /// Called from `idle()`. When `force` is set (engine stopped, no audio
    /// thread), everything is reclaimed.
    pub fn collect_retired(&self, force: bool) {
        let mut retired = self.retired.lock();
        if force {
            retired.clear();
        } else {
            retired.retain(|(tag, _)| !self.generation.has_passed(*tag));
        }
    }

    #[cfg(test)]
    fn retired_len(&self) -> usize {
        self.retired.lock().len()
    }
}
