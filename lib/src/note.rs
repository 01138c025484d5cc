use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::field::Field;
use crate::hash::PoolHasher;

/// Serialized size of a note: `value (8) || secret (32) || nullifier (32)`.
pub const NOTE_BYTES: usize = 72;

/// The secret record a holder needs to spend a commitment.
///
/// Commitment and nullifier hash are always derived from these fields:
///   commitment    = H2(H2(value, secret), nullifier)
///   nullifierHash = H1(nullifier)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    /// Value held by the note
    pub value: u64,
    /// Random blinding secret
    pub secret: Field,
    /// Revealed (hashed) when the note is spent
    pub nullifier: Field,
}

impl Note {
    pub fn new(value: u64, secret: Field, nullifier: Field) -> Self {
        Self {
            value,
            secret,
            nullifier,
        }
    }

    /// A note with fresh random secret and nullifier.
    pub fn random<R: RngCore>(value: u64, rng: &mut R) -> Self {
        Self {
            value,
            secret: Field(rng.gen()),
            nullifier: Field(rng.gen()),
        }
    }

    pub fn commitment<H: PoolHasher>(&self, hasher: &H) -> Field {
        let inner = hasher.hash_two(&Field::from(self.value), &self.secret);
        hasher.hash_two(&inner, &self.nullifier)
    }

    pub fn nullifier_hash<H: PoolHasher>(&self, hasher: &H) -> Field {
        hasher.hash_one(&self.nullifier)
    }

    pub fn to_bytes(&self) -> [u8; NOTE_BYTES] {
        let mut out = [0u8; NOTE_BYTES];
        out[0..8].copy_from_slice(&self.value.to_be_bytes());
        out[8..40].copy_from_slice(self.secret.as_bytes());
        out[40..72].copy_from_slice(self.nullifier.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != NOTE_BYTES {
            return Err(CodecError::WrongLength {
                expected: NOTE_BYTES,
                got: bytes.len(),
            });
        }
        let mut value = [0u8; 8];
        value.copy_from_slice(&bytes[0..8]);
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&bytes[8..40]);
        let mut nullifier = [0u8; 32];
        nullifier.copy_from_slice(&bytes[40..72]);
        Ok(Self {
            value: u64::from_be_bytes(value),
            secret: Field(secret),
            nullifier: Field(nullifier),
        })
    }
}
