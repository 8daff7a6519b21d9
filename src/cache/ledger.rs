//! Ledger Module
//!
//! The ordered key sequence that defines queue order, plus the compaction
//! routine used to drop many positions in one pass.

use std::collections::VecDeque;

use crate::error::{CacheError, Result};

// == Slot ==
/// One ledger entry: a key and the stamp of the item it was written for.
///
/// A slot whose stamp no longer matches the live item for its key (or whose
/// key has no item at all) is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot<K> {
    pub key: K,
    pub stamp: u64,
}

// == Ledger ==
/// Ordered sequence of keys.
///
/// - Front = head (dequeue, peek, add-front)
/// - Back = tail (enqueue)
#[derive(Debug)]
pub struct Ledger<K> {
    slots: VecDeque<Slot<K>>,
}

impl<K> Default for Ledger<K> {
    fn default() -> Self {
        Self {
            slots: VecDeque::new(),
        }
    }
}

impl<K> Ledger<K> {
    // == Constructor ==
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push_back(&mut self, slot: Slot<K>) {
        self.slots.push_back(slot);
    }

    pub fn push_front(&mut self, slot: Slot<K>) {
        self.slots.push_front(slot);
    }

    /// Appends a block of slots at the tail, keeping their order.
    pub fn append_block(&mut self, block: Vec<Slot<K>>) {
        self.slots.extend(block);
    }

    /// Prepends a block of slots at the head, keeping their order.
    pub fn prepend_block(&mut self, block: Vec<Slot<K>>) {
        for slot in block.into_iter().rev() {
            self.slots.push_front(slot);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot<K>> {
        self.slots.iter()
    }

    // == Move To Front ==
    /// Moves the slot at `position` to the head. Out-of-range positions are ignored.
    pub fn move_to_front(&mut self, position: usize) {
        if let Some(slot) = self.slots.remove(position) {
            self.slots.push_front(slot);
        }
    }

    // == Compact ==
    /// Removes the given positions, which must be strictly increasing.
    pub fn compact(&mut self, positions: &[usize]) -> Result<()> {
        remove_positions(&mut self.slots, positions)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Replaces the whole ledger with a single slot.
    pub fn reset_to(&mut self, slot: Slot<K>) {
        self.slots.clear();
        self.slots.push_back(slot);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<K: PartialEq> Ledger<K> {
    /// Position of the slot holding `key` with the given stamp.
    pub fn position(&self, key: &K, stamp: u64) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.stamp == stamp && slot.key == *key)
    }
}

impl<K: Clone> Ledger<K> {
    /// Raw key snapshot in ledger order, tombstones included.
    pub fn keys(&self) -> Vec<K> {
        self.slots.iter().map(|slot| slot.key.clone()).collect()
    }
}

// == Remove Positions ==
/// Removes `positions` from `seq` in one pass, keeping survivor order.
///
/// `positions` must be strictly increasing and in range. Kept runs between
/// removal points are moved across whole, so the cost is linear in the
/// sequence length.
///
/// # Errors
/// `ConsistencyViolation` if the positions are unsorted, repeated, out of
/// range, or outnumber the elements. The sequence is left untouched.
pub fn remove_positions<T>(seq: &mut VecDeque<T>, positions: &[usize]) -> Result<()> {
    let Some(&last) = positions.last() else {
        return Ok(());
    };
    if positions.len() > seq.len() {
        return Err(CacheError::ConsistencyViolation(format!(
            "{} positions requested for a sequence of {}",
            positions.len(),
            seq.len()
        )));
    }
    if positions.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(CacheError::ConsistencyViolation(
            "positions must be strictly increasing".to_string(),
        ));
    }
    if last >= seq.len() {
        return Err(CacheError::ConsistencyViolation(format!(
            "position {} out of range for a sequence of {}",
            last,
            seq.len()
        )));
    }

    let mut rest = std::mem::take(seq);
    let mut kept = VecDeque::with_capacity(rest.len() - positions.len());
    let mut consumed = 0;
    for &position in positions {
        // [kept run][removed]
        kept.extend(rest.drain(..position - consumed));
        rest.pop_front();
        consumed = position + 1;
    }
    kept.extend(rest);
    *seq = kept;
    Ok(())
}
