//! 32-slot profile table with debounced active-index persistence.
//!
//! Layout in storage:
//!
//! | namespace    | key            | value                               |
//! |--------------|----------------|-------------------------------------|
//! | `profiles`   | `curIdx`       | active slot, `i32` little-endian    |
//! | `profs_data` | `p_0`..`p_31`  | one [`record`](super::record) each  |
//!
//! Every storage call is open-write-close through the [`StoragePort`];
//! nothing is held across ticks.

use log::{debug, info, warn};

use crate::app::ports::StoragePort;
use crate::error::ProfileError;

use super::record::{self, RECORD_LEN};
use super::{MAX_PROFILES, Profile};

pub const INDEX_NAMESPACE: &str = "profiles";
pub const INDEX_KEY: &str = "curIdx";
pub const DATA_NAMESPACE: &str = "profs_data";

/// The profile table.  At least one slot is always non-empty.
pub struct ProfileStore {
    slots: Vec<Profile>,
    active: usize,
    dirty: bool,
    /// When the active index last changed without being persisted.
    settle_since_ms: Option<u64>,
    settle_ms: u64,
}

impl ProfileStore {
    /// Restore the table and active index from storage.
    ///
    /// Unreadable or empty records become free slots.  A completely empty
    /// table gets the built-in standard profile in slot 0, and an active
    /// index that is out of range or points at a free slot is moved to the
    /// first used slot.  Both corrections are persisted straight away.
    pub fn load(storage: &mut impl StoragePort, settle_ms: u32) -> Self {
        let mut slots: Vec<Profile> = (0..MAX_PROFILES).map(|_| Profile::default()).collect();
        let mut buf = vec![0u8; RECORD_LEN];

        for (i, slot) in slots.iter_mut().enumerate() {
            let key = record::slot_key(i);
            match storage.stored_len(DATA_NAMESPACE, &key) {
                Ok(RECORD_LEN) => {}
                Ok(len) => {
                    debug!("PROFILE: slot {} has {} bytes, treated as empty", i, len);
                    continue;
                }
                Err(_) => continue,
            }
            match storage.read(DATA_NAMESPACE, &key, &mut buf) {
                Ok(n) => {
                    if let Some(p) = record::decode(&buf[..n]) {
                        debug!("PROFILE: slot {} '{}' ({} steps)", i, p.name(), p.steps().len());
                        *slot = p;
                    }
                }
                Err(e) => warn!("PROFILE: reading slot {} failed: {}", i, e),
            }
        }

        let stored_index = read_index(&*storage);

        let mut store = Self {
            slots,
            active: 0,
            dirty: false,
            settle_since_ms: None,
            settle_ms: u64::from(settle_ms),
        };

        let first = match store.first_non_empty() {
            Some(i) => i,
            None => {
                info!("PROFILE: no stored profiles, creating the standard profile");
                store.slots[0] = Profile::standard();
                store.persist_slot_logged(storage, 0);
                0
            }
        };

        match stored_index {
            Some(i) if i < MAX_PROFILES && !store.slots[i].is_empty() => store.active = i,
            other => {
                warn!(
                    "PROFILE: active index {:?} invalid, switching to slot {}",
                    other, first
                );
                store.active = first;
                store.persist_index_logged(storage);
            }
        }

        info!(
            "PROFILE: loaded, active '{}' (slot {})",
            store.active().name(),
            store.active
        );
        store
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Profile {
        &self.slots[self.active]
    }

    /// Mutable access to the active profile for in-place step edits.
    /// Callers are expected to [`mark_dirty`](Self::mark_dirty).
    pub fn active_mut(&mut self) -> &mut Profile {
        &mut self.slots[self.active]
    }

    pub fn get(&self, slot: usize) -> Option<&Profile> {
        self.slots.get(slot)
    }

    pub fn slots(&self) -> &[Profile] {
        &self.slots
    }

    /// A free slot has no steps.
    pub fn is_free(&self, slot: usize) -> bool {
        self.slots.get(slot).is_none_or(Profile::is_empty)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// `true` while an active-index change waits for its settle delay.
    pub fn settle_pending(&self) -> bool {
        self.settle_since_ms.is_some()
    }

    fn first_non_empty(&self) -> Option<usize> {
        self.slots.iter().position(|p| !p.is_empty())
    }

    /// Next used slot from `from` in `direction`, wrapping around.
    ///
    /// Returns `None` when no other slot is in use.
    pub fn next_non_empty(&self, from: usize, direction: i32) -> Option<usize> {
        let step = if direction >= 0 { 1 } else { MAX_PROFILES - 1 };
        let mut next = from % MAX_PROFILES;
        for _ in 0..MAX_PROFILES {
            next = (next + step) % MAX_PROFILES;
            if !self.slots[next].is_empty() {
                break;
            }
        }
        (next != from && !self.slots[next].is_empty()).then_some(next)
    }

    // ── Persistence ───────────────────────────────────────────

    /// Persist exactly one slot's record.
    pub fn save(&self, storage: &mut impl StoragePort, slot: usize) -> Result<(), ProfileError> {
        let profile = self.slots.get(slot).ok_or(ProfileError::InvalidSlot(slot))?;
        storage.write(DATA_NAMESPACE, &record::slot_key(slot), &record::encode(profile))?;
        debug!("PROFILE: slot {} ('{}') saved", slot, profile.name());
        Ok(())
    }

    /// Save the active slot if it has unsaved edits.
    pub fn flush_dirty(&mut self, storage: &mut impl StoragePort) -> Result<(), ProfileError> {
        if !self.dirty {
            return Ok(());
        }
        self.save(storage, self.active)?;
        self.dirty = false;
        Ok(())
    }

    fn persist_index(&self, storage: &mut impl StoragePort) -> Result<(), ProfileError> {
        storage.write(
            INDEX_NAMESPACE,
            INDEX_KEY,
            &(self.active as i32).to_le_bytes(),
        )?;
        Ok(())
    }

    fn persist_index_logged(&self, storage: &mut impl StoragePort) {
        if let Err(e) = self.persist_index(storage) {
            warn!("PROFILE: persisting active index failed: {}", e);
        }
    }

    fn persist_slot_logged(&self, storage: &mut impl StoragePort, slot: usize) {
        if let Err(e) = self.save(storage, slot) {
            warn!("PROFILE: {}", e);
        }
    }

    // ── Selection ─────────────────────────────────────────────

    /// Select a slot and (re)start the settle delay.
    ///
    /// The index is only written once it has stayed unchanged for the full
    /// delay; see [`poll_settle`](Self::poll_settle).
    pub fn set_active_index(&mut self, slot: usize, now_ms: u64) -> Result<(), ProfileError> {
        self.check_selectable(slot)?;
        if slot != self.active {
            self.active = slot;
            self.dirty = false;
            self.settle_since_ms = Some(now_ms);
        }
        Ok(())
    }

    /// Persist a settled active index.  Returns `true` when it was written.
    pub fn poll_settle(&mut self, storage: &mut impl StoragePort, now_ms: u64) -> bool {
        let Some(since) = self.settle_since_ms else {
            return false;
        };
        if now_ms.saturating_sub(since) < self.settle_ms {
            return false;
        }
        self.settle_since_ms = None;
        self.persist_index_logged(storage);
        info!("PROFILE: settled on slot {}", self.active);
        true
    }

    /// Select a slot and persist the index immediately.
    pub fn set_active_now(
        &mut self,
        storage: &mut impl StoragePort,
        slot: usize,
    ) -> Result<(), ProfileError> {
        self.check_selectable(slot)?;
        self.active = slot;
        self.dirty = false;
        self.settle_since_ms = None;
        self.persist_index(storage)
    }

    fn check_selectable(&self, slot: usize) -> Result<(), ProfileError> {
        match self.slots.get(slot) {
            None => Err(ProfileError::InvalidSlot(slot)),
            Some(p) if p.is_empty() => Err(ProfileError::EmptySlot(slot)),
            Some(_) => Ok(()),
        }
    }

    // ── Editing ───────────────────────────────────────────────

    /// Clear a slot and persist it.
    ///
    /// Deleting the active slot reselects the first used slot (creating the
    /// standard profile if none is left) and persists the new index without
    /// waiting for the settle delay.  Returns `true` if the active profile
    /// changed.
    pub fn delete(
        &mut self,
        storage: &mut impl StoragePort,
        slot: usize,
    ) -> Result<bool, ProfileError> {
        let profile = self
            .slots
            .get_mut(slot)
            .ok_or(ProfileError::InvalidSlot(slot))?;
        if profile.is_empty() && profile.name().is_empty() {
            return Ok(false);
        }
        info!("PROFILE: deleting slot {} ('{}')", slot, profile.name());
        profile.clear();
        self.save(storage, slot)?;

        if slot != self.active {
            return Ok(false);
        }

        let replacement = match self.first_non_empty() {
            Some(i) => i,
            None => {
                info!("PROFILE: last profile deleted, recreating the standard profile");
                self.slots[0] = Profile::standard();
                self.save(storage, 0)?;
                0
            }
        };
        self.active = replacement;
        self.dirty = false;
        self.settle_since_ms = None;
        self.persist_index(storage)?;
        Ok(true)
    }

    /// Store an imported profile, overwriting a slot of the same name or
    /// taking the first free one.  Returns the slot used.
    pub fn import_or_update(
        &mut self,
        storage: &mut impl StoragePort,
        candidate: Profile,
    ) -> Result<usize, ProfileError> {
        let slot = self
            .slots
            .iter()
            .position(|p| p.name() == candidate.name())
            .or_else(|| self.slots.iter().position(Profile::is_empty))
            .ok_or(ProfileError::StoreFull)?;

        info!(
            "PROFILE: import '{}' into slot {}",
            candidate.name(),
            slot
        );
        self.slots[slot] = candidate;
        if slot == self.active {
            self.dirty = false;
        }
        self.save(storage, slot)?;
        Ok(slot)
    }

    /// Replace a slot by id and persist it.
    pub fn put(
        &mut self,
        storage: &mut impl StoragePort,
        slot: usize,
        profile: Profile,
    ) -> Result<(), ProfileError> {
        if slot >= MAX_PROFILES {
            return Err(ProfileError::InvalidSlot(slot));
        }
        self.slots[slot] = profile;
        if slot == self.active {
            self.dirty = false;
        }
        self.save(storage, slot)
    }
}

fn read_index(storage: &impl StoragePort) -> Option<usize> {
    let mut raw = [0u8; 4];
    match storage.read(INDEX_NAMESPACE, INDEX_KEY, &mut raw) {
        Ok(4) => usize::try_from(i32::from_le_bytes(raw)).ok(),
        _ => None,
    }
}
