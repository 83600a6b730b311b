//! Ordered result assembly
//!
//! `ResultSet` is a slot store addressed by discovery sequence number. The
//! discoverer reserves a slot before queueing an item and exactly one worker
//! fills it. Writes go into a fixed position, so completion order never
//! affects output order.

use crate::crawler::parser::ContentFragment;
use crate::state::ItemState;
use crate::HarvestError;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Posts collected for one thread, in page order
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResult {
    pub fragments: Vec<ContentFragment>,

    /// How far the worker got
    pub state: ItemState,

    /// Number of thread pages fetched and extracted
    pub pages_visited: u32,
}

impl ItemResult {
    /// Result for a thread that was never worked on because the run was cancelled
    pub fn cancelled() -> Self {
        Self {
            fragments: Vec::new(),
            state: ItemState::Cancelled,
            pages_visited: 0,
        }
    }
}

/// Slot store of `ItemResult`s keyed by sequence number
#[derive(Debug, Default)]
pub struct ResultSet {
    slots: Mutex<Vec<Option<ItemResult>>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure a slot exists for `sequence`
    ///
    /// Slots are created lazily as items are discovered. Reserving an
    /// existing slot is a no-op.
    pub fn reserve(&self, sequence: u64) {
        let index = sequence as usize;
        let mut slots = self.lock();
        if slots.len() <= index {
            slots.resize(index + 1, None);
        }
    }

    /// Writes the result for `sequence` into its slot
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The slot was empty and is now filled
    /// * `Err(HarvestError::Coordination)` - The slot was never reserved or
    ///   was already filled
    pub fn set(&self, sequence: u64, result: ItemResult) -> Result<(), HarvestError> {
        let mut slots = self.lock();
        match slots.get_mut(sequence as usize) {
            None => Err(HarvestError::Coordination(format!(
                "result for sequence {} written to an unreserved slot",
                sequence
            ))),
            Some(Some(_)) => Err(HarvestError::Coordination(format!(
                "result for sequence {} written twice",
                sequence
            ))),
            Some(slot) => {
                *slot = Some(result);
                Ok(())
            }
        }
    }

    /// Number of reserved slots
    pub fn reserved(&self) -> usize {
        self.lock().len()
    }

    /// Number of reserved slots not yet filled
    pub fn pending(&self) -> usize {
        self.lock().iter().filter(|slot| slot.is_none()).count()
    }

    /// Returns true once every reserved slot is filled
    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }

    /// Fills every empty slot with a cancelled result
    ///
    /// Returns the number of slots filled.
    pub fn finish_cancelled(&self) -> usize {
        let mut filled = 0;
        for slot in self.lock().iter_mut().filter(|slot| slot.is_none()) {
            *slot = Some(ItemResult::cancelled());
            filled += 1;
        }
        filled
    }

    /// Takes all results in ascending sequence order, leaving the set empty
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ItemResult>)` - One result per reserved sequence number
    /// * `Err(HarvestError::Coordination)` - A reserved slot was never filled
    pub fn take_results(&self) -> Result<Vec<ItemResult>, HarvestError> {
        let mut slots = self.lock();
        if let Some(missing) = slots.iter().position(Option::is_none) {
            return Err(HarvestError::Coordination(format!(
                "no result for sequence {} ({} of {} slots empty)",
                missing,
                slots.iter().filter(|slot| slot.is_none()).count(),
                slots.len()
            )));
        }

        Ok(std::mem::take(&mut *slots).into_iter().flatten().collect())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<ItemResult>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
