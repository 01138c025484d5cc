//! Pluggable compression functions.
//!
//! A pool is built over exactly one [`PoolHasher`]. The two shipped hashers
//! produce different commitments and roots for the same note, so they can
//! never share a tree.

use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

use crate::field::Field;

/// `H1` and `H2` of the pool protocol.
pub trait PoolHasher: Clone + Send + Sync {
    /// `H1(a)`, used for nullifier hashing.
    fn hash_one(&self, input: &Field) -> Field;

    /// `H2(left, right)`, used for tree nodes and commitments. Operand
    /// order matters.
    fn hash_two(&self, left: &Field, right: &Field) -> Field;
}

/// Compute keccak256 hash. This matches Solidity's keccak256() opcode.
/// Note: tiny_keccak::Keccak is the original Keccak-256 (NOT SHA3-256).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Keccak-256 over the packed operands, i.e. Solidity's
/// `keccak256(abi.encodePacked(left, right))`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Keccak256Hasher;

impl PoolHasher for Keccak256Hasher {
    fn hash_one(&self, input: &Field) -> Field {
        Field(keccak256(input.as_bytes()))
    }

    fn hash_two(&self, left: &Field, right: &Field) -> Field {
        let mut data = [0u8; 64];
        data[..32].copy_from_slice(left.as_bytes());
        data[32..].copy_from_slice(right.as_bytes());
        Field(keccak256(&data))
    }
}

const SHA256_TAG_ONE: u8 = 0x01;
const SHA256_TAG_TWO: u8 = 0x02;

/// SHA-256 with a one-byte arity tag in front of the operands.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl PoolHasher for Sha256Hasher {
    fn hash_one(&self, input: &Field) -> Field {
        let mut hasher = Sha256::new();
        hasher.update([SHA256_TAG_ONE]);
        hasher.update(input.as_bytes());
        Field(hasher.finalize().into())
    }

    fn hash_two(&self, left: &Field, right: &Field) -> Field {
        let mut hasher = Sha256::new();
        hasher.update([SHA256_TAG_TWO]);
        hasher.update(left.as_bytes());
        hasher.update(right.as_bytes());
        Field(hasher.finalize().into())
    }
}
