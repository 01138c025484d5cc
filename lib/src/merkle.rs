//! Fixed-depth, append-only binary commitment tree.
//!
//! Every computed node is cached per level, so `insert` touches one node per
//! level and `root`/`prove_membership` never rebuild the tree. The naive
//! from-scratch definition is kept in [`compute_root`] and the two must
//! always agree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::field::Field;
use crate::hash::PoolHasher;

/// Children per node.
pub const ARITY: u64 = 2;

/// Largest supported depth; keeps `ARITY^depth` within `u64`.
pub const MAX_DEPTH: usize = 32;

/// Authentication path from a leaf to the root.
///
/// `path_indices[i] == 0` means the node at level `i` is a left child, so the
/// parent is `H2(current, siblings[i])`; `1` means it is a right child and the
/// parent is `H2(siblings[i], current)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub siblings: Vec<Field>,
    pub path_indices: Vec<u8>,
}

/// Verify a Merkle proof against an expected root.
///
/// Needs no tree state: this is the same walk a withdraw circuit performs.
/// Malformed proofs (length mismatch, index other than 0/1) return `false`.
pub fn verify_merkle_proof<H: PoolHasher>(
    hasher: &H,
    leaf: &Field,
    proof: &MerkleProof,
    expected_root: &Field,
) -> bool {
    if proof.siblings.len() != proof.path_indices.len() {
        return false;
    }
    let mut current = *leaf;
    for (sibling, index) in proof.siblings.iter().zip(&proof.path_indices) {
        current = match index {
            0 => hasher.hash_two(&current, sibling),
            1 => hasher.hash_two(sibling, &current),
            _ => return false,
        };
    }
    current == *expected_root
}

/// Zero values for each level: `zeros[0] = zero_value`,
/// `zeros[i] = H2(zeros[i-1], zeros[i-1])`. Returns `depth + 1` entries, the
/// last being the empty-tree root.
pub fn compute_zeros<H: PoolHasher>(hasher: &H, zero_value: Field, depth: usize) -> Vec<Field> {
    let mut zeros = Vec::with_capacity(depth + 1);
    zeros.push(zero_value);
    for i in 1..=depth {
        zeros.push(hasher.hash_two(&zeros[i - 1], &zeros[i - 1]));
    }
    zeros
}

/// Root of `leaves` padded with `zero_value` out to `2^depth`, computed level
/// by level from scratch. Only practical for small depths; the tree uses it
/// in tests as the reference definition.
pub fn compute_root<H: PoolHasher>(
    hasher: &H,
    leaves: &[Field],
    zero_value: Field,
    depth: usize,
) -> Field {
    let num_leaves = 1usize << depth;
    let mut current_level: Vec<Field> = Vec::with_capacity(num_leaves);
    for i in 0..num_leaves {
        current_level.push(leaves.get(i).copied().unwrap_or(zero_value));
    }
    for _ in 0..depth {
        current_level = current_level
            .chunks(2)
            .map(|pair| hasher.hash_two(&pair[0], &pair[1]))
            .collect();
    }
    current_level[0]
}

#[derive(Clone, Debug)]
pub struct CommitmentTree<H> {
    hasher: H,
    depth: usize,
    zeros: Vec<Field>,
    /// `nodes[level][i]` for every node with at least one real leaf below it.
    /// `nodes[0]` is the leaf list in insertion order.
    nodes: Vec<Vec<Field>>,
    index_of: HashMap<Field, u64>,
}

impl<H: PoolHasher> CommitmentTree<H> {
    /// Create an empty tree. `depth` must be in `1..=MAX_DEPTH`; the pool
    /// config validates this before a tree is built.
    pub fn new(hasher: H, depth: usize, zero_value: Field) -> Self {
        let zeros = compute_zeros(&hasher, zero_value, depth);
        Self {
            hasher,
            depth,
            zeros,
            nodes: vec![Vec::new(); depth + 1],
            index_of: HashMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn zero_value(&self) -> Field {
        self.zeros[0]
    }

    /// `ARITY^depth`.
    pub fn capacity(&self) -> u64 {
        ARITY.pow(self.depth as u32)
    }

    pub fn len(&self) -> u64 {
        self.nodes[0].len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].is_empty()
    }

    pub fn leaves(&self) -> &[Field] {
        &self.nodes[0]
    }

    pub fn contains(&self, leaf: &Field) -> bool {
        self.index_of.contains_key(leaf)
    }

    pub fn index_of(&self, leaf: &Field) -> Option<u64> {
        self.index_of.get(leaf).copied()
    }

    /// Root of the empty tree of this depth.
    pub fn empty_root(&self) -> Field {
        self.zeros[self.depth]
    }

    pub fn root(&self) -> Field {
        self.nodes[self.depth]
            .first()
            .copied()
            .unwrap_or_else(|| self.empty_root())
    }

    /// Append `leaf` and return its index. On error the tree is unchanged.
    pub fn insert(&mut self, leaf: Field) -> Result<u64, TreeError> {
        if self.index_of.contains_key(&leaf) {
            return Err(TreeError::DuplicateLeaf(leaf));
        }
        let index = self.len();
        if index >= self.capacity() {
            return Err(TreeError::TreeFull {
                capacity: self.capacity(),
            });
        }

        self.nodes[0].push(leaf);
        let mut current_index = index as usize;
        for level in 0..self.depth {
            let left_index = current_index & !1;
            let left = self.nodes[level][left_index];
            let right = self.node(level, left_index + 1);
            let parent = self.hasher.hash_two(&left, &right);

            let parent_index = current_index / 2;
            let parents = &mut self.nodes[level + 1];
            if parent_index < parents.len() {
                parents[parent_index] = parent;
            } else {
                parents.push(parent);
            }
            current_index = parent_index;
        }

        self.index_of.insert(leaf, index);
        Ok(index)
    }

    /// Authentication path for the leaf at `leaf_index`.
    pub fn prove_membership(&self, leaf_index: u64) -> Result<MerkleProof, TreeError> {
        if leaf_index >= self.len() {
            return Err(TreeError::LeafIndexOutOfRange {
                index: leaf_index,
                leaf_count: self.len(),
            });
        }

        let mut siblings = Vec::with_capacity(self.depth);
        let mut path_indices = Vec::with_capacity(self.depth);
        let mut idx = leaf_index as usize;
        for level in 0..self.depth {
            siblings.push(self.node(level, idx ^ 1));
            path_indices.push((idx & 1) as u8);
            idx /= 2;
        }

        Ok(MerkleProof {
            siblings,
            path_indices,
        })
    }

    fn node(&self, level: usize, index: usize) -> Field {
        self.nodes[level]
            .get(index)
            .copied()
            .unwrap_or(self.zeros[level])
    }
}
