//! Registry of redeemed nullifier hashes.

use std::collections::HashSet;

use crate::field::Field;

/// Set of spent nullifier hashes. Membership is permanent.
#[derive(Clone, Debug, Default)]
pub struct NullifierRegistry {
    spent: HashSet<Field>,
}

impl NullifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the nullifier hash has already been redeemed.
    pub fn contains(&self, nullifier_hash: &Field) -> bool {
        self.spent.contains(nullifier_hash)
    }

    /// Test and insert in one step. Returns `true` if the hash was unseen and
    /// is now reserved, `false` if it was already spent.
    pub fn check_and_reserve(&mut self, nullifier_hash: Field) -> bool {
        self.spent.insert(nullifier_hash)
    }

    /// Undo a reservation made by the same transition that is now aborting.
    pub(crate) fn release(&mut self, nullifier_hash: &Field) {
        self.spent.remove(nullifier_hash);
    }

    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }
}
