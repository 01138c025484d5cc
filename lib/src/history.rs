//! Bounded window of recent tree roots.

use std::collections::HashMap;

use crate::field::Field;

/// Ring buffer of the last `capacity` recorded roots with an O(1) validity
/// index.
///
/// The index counts occurrences, so a root recorded twice inside the window
/// stays valid until its last occurrence is overwritten.
#[derive(Clone, Debug)]
pub struct RootHistory {
    slots: Vec<Option<Field>>,
    cursor: usize,
    live: HashMap<Field, usize>,
}

impl RootHistory {
    /// History seeded with `initial_root` (the empty-tree root).
    ///
    /// `capacity` must be non-zero; the pool config checks this.
    pub fn new(capacity: usize, initial_root: Field) -> Self {
        let mut history = Self {
            slots: vec![None; capacity],
            cursor: 0,
            live: HashMap::new(),
        };
        history.record_root(initial_root);
        history
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Write `root` at the cursor, evicting whatever occupied the slot.
    pub fn record_root(&mut self, root: Field) {
        if let Some(evicted) = self.slots[self.cursor].replace(root) {
            if let Some(count) = self.live.get_mut(&evicted) {
                *count -= 1;
                if *count == 0 {
                    self.live.remove(&evicted);
                }
            }
        }
        *self.live.entry(root).or_insert(0) += 1;
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Whether `root` is inside the window. The zero root is never valid.
    pub fn is_valid(&self, root: &Field) -> bool {
        !root.is_zero() && self.live.contains_key(root)
    }
}
