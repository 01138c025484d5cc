//! Proof verification port.
//!
//! The pool never looks inside a proof. It hands the bytes to a
//! [`ProofVerifier`] and works with the public inputs it gets back.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::PublicInputs;
use crate::error::VerifierError;
use crate::field::Field;
use crate::hash::PoolHasher;
use crate::merkle::{verify_merkle_proof, MerkleProof};
use crate::note::Note;

/// Outcome of verifying one proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedProof {
    pub valid: bool,
    /// Public inputs in the 25-word layout of [`crate::codec`].
    pub public_inputs: Vec<u32>,
}

impl VerifiedProof {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            public_inputs: Vec::new(),
        }
    }
}

/// Any backend that can check a withdrawal proof.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, proof: &[u8]) -> Result<VerifiedProof, VerifierError>;
}

impl<V: ProofVerifier + ?Sized> ProofVerifier for std::sync::Arc<V> {
    fn verify(&self, proof: &[u8]) -> Result<VerifiedProof, VerifierError> {
        (**self).verify(proof)
    }
}

/// Private inputs of the withdraw circuit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawWitness {
    /// The input note to spend
    pub note: Note,
    /// Merkle proof for the input note
    pub merkle_proof: MerkleProof,
    /// The Merkle root the proof verifies against
    pub root: Field,
    /// Amount to withdraw (public)
    pub withdraw_amount: u64,
    /// Change note for partial withdrawals (None for full withdrawal)
    pub change_note: Option<Note>,
}

impl WithdrawWitness {
    pub fn to_proof_bytes(&self) -> Result<Vec<u8>, VerifierError> {
        serde_json::to_vec(self).map_err(|e| VerifierError::Malformed(e.to_string()))
    }
}

/// Executes the withdraw circuit natively instead of checking a succinct
/// proof. The "proof" is a JSON [`WithdrawWitness`].
///
/// This is the development backend: it enforces the same constraints a real
/// circuit would, but it sees the witness, so it offers no privacy.
#[derive(Clone, Debug, Default)]
pub struct WitnessVerifier<H> {
    hasher: H,
}

impl<H: PoolHasher> WitnessVerifier<H> {
    pub fn new(hasher: H) -> Self {
        Self { hasher }
    }

    /// Run the circuit constraints. `None` if any of them fails.
    pub fn execute(&self, witness: &WithdrawWitness) -> Option<PublicInputs> {
        let note = &witness.note;
        let commitment = note.commitment(&self.hasher);
        if !verify_merkle_proof(&self.hasher, &commitment, &witness.merkle_proof, &witness.root) {
            return None;
        }

        let new_commitment = match &witness.change_note {
            Some(change) => {
                let total = witness.withdraw_amount.checked_add(change.value)?;
                if total != note.value {
                    return None;
                }
                let change_commitment = change.commitment(&self.hasher);
                if change_commitment.is_zero() {
                    return None;
                }
                change_commitment
            }
            None => {
                if witness.withdraw_amount != note.value {
                    return None;
                }
                Field::ZERO
            }
        };

        Some(PublicInputs {
            withdraw_amount: witness.withdraw_amount,
            merkle_root: witness.root,
            nullifier_hash: note.nullifier_hash(&self.hasher),
            new_commitment,
        })
    }
}

impl<H: PoolHasher> ProofVerifier for WitnessVerifier<H> {
    fn verify(&self, proof: &[u8]) -> Result<VerifiedProof, VerifierError> {
        let witness: WithdrawWitness = match serde_json::from_slice(proof) {
            Ok(w) => w,
            Err(e) => {
                debug!("witness decode failed: {e}");
                return Ok(VerifiedProof::invalid());
            }
        };
        let Some(public) = self.execute(&witness) else {
            return Ok(VerifiedProof::invalid());
        };
        match public.encode() {
            Ok(words) => Ok(VerifiedProof {
                valid: true,
                public_inputs: words.to_vec(),
            }),
            Err(_) => Ok(VerifiedProof::invalid()),
        }
    }
}
