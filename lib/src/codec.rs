//! Public-input codec shared by the proof producer and the pool.
//!
//! Layout (25 big-endian `u32` words):
//!   [0]      withdrawAmount
//!   [1..9]   merkleRoot     (8 limbs)
//!   [9..17]  nullifierHash  (8 limbs)
//!   [17..25] newCommitment  (8 limbs, all zero for a full withdrawal)

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::field::{Field, FIELD_LIMBS};

pub const PUBLIC_INPUT_WORDS: usize = 1 + 3 * FIELD_LIMBS;

const ROOT_OFFSET: usize = 1;
const NULLIFIER_OFFSET: usize = ROOT_OFFSET + FIELD_LIMBS;
const COMMITMENT_OFFSET: usize = NULLIFIER_OFFSET + FIELD_LIMBS;

/// The claims a withdrawal proof makes publicly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs {
    pub withdraw_amount: u64,
    pub merkle_root: Field,
    pub nullifier_hash: Field,
    /// `Field::ZERO` when there is no remainder.
    pub new_commitment: Field,
}

impl PublicInputs {
    pub fn remainder_commitment(&self) -> Option<Field> {
        (!self.new_commitment.is_zero()).then_some(self.new_commitment)
    }

    /// Fails if `withdraw_amount` does not fit in one 32-bit word.
    pub fn encode(&self) -> Result<[u32; PUBLIC_INPUT_WORDS], CodecError> {
        let amount = u32::try_from(self.withdraw_amount).map_err(|_| CodecError::OutOfRange {
            field: "withdrawAmount",
            value: self.withdraw_amount,
            bits: u32::BITS,
        })?;

        let mut words = [0u32; PUBLIC_INPUT_WORDS];
        words[0] = amount;
        words[ROOT_OFFSET..NULLIFIER_OFFSET].copy_from_slice(&self.merkle_root.to_limbs());
        words[NULLIFIER_OFFSET..COMMITMENT_OFFSET].copy_from_slice(&self.nullifier_hash.to_limbs());
        words[COMMITMENT_OFFSET..].copy_from_slice(&self.new_commitment.to_limbs());
        Ok(words)
    }

    pub fn decode(words: &[u32]) -> Result<Self, CodecError> {
        if words.len() != PUBLIC_INPUT_WORDS {
            return Err(CodecError::WrongLength {
                expected: PUBLIC_INPUT_WORDS,
                got: words.len(),
            });
        }
        Ok(Self {
            withdraw_amount: u64::from(words[0]),
            merkle_root: field_at(words, ROOT_OFFSET),
            nullifier_hash: field_at(words, NULLIFIER_OFFSET),
            new_commitment: field_at(words, COMMITMENT_OFFSET),
        })
    }
}

fn field_at(words: &[u32], offset: usize) -> Field {
    let mut limbs = [0u32; FIELD_LIMBS];
    limbs.copy_from_slice(&words[offset..offset + FIELD_LIMBS]);
    Field::from_limbs(&limbs)
}

/// Big-endian byte form of a word slice, as proof systems usually commit
/// public values.
pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

pub fn bytes_to_words(bytes: &[u8]) -> Result<Vec<u32>, CodecError> {
    if bytes.len() % 4 != 0 {
        return Err(CodecError::WrongLength {
            expected: bytes.len().next_multiple_of(4),
            got: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
