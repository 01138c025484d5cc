//! The pool: one owner for the commitment tree, root history and nullifier
//! registry, and the withdrawal protocol that reconciles a proof's public
//! claims against them.
//!
//! Withdrawal stages:
//!   Received -> ProofChecked -> RootChecked -> NullifierReserved -> Settled
//! Any stage can end in a rejection, returned as a [`PoolError`]. Proof
//! verification runs without the state lock; everything after it runs under
//! a single write lock, so the checks and the mutations they guard cannot
//! interleave with another deposit or withdrawal.

use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codec::PublicInputs;
use crate::config::PoolConfig;
use crate::error::{PoolError, TreeError};
use crate::field::Field;
use crate::hash::PoolHasher;
use crate::history::RootHistory;
use crate::merkle::{CommitmentTree, MerkleProof};
use crate::note::Note;
use crate::nullifier::NullifierRegistry;
use crate::verifier::ProofVerifier;

/// Recipient of a withdrawal (20-byte account address).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawalStage {
    Received,
    ProofChecked,
    RootChecked,
    NullifierReserved,
    Settled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub commitment: Field,
    pub leaf_index: u64,
    pub amount: u64,
    /// Root after the insertion
    pub root: Field,
}

/// The note commitment created for the unspent part of a partial withdrawal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remainder {
    pub commitment: Field,
    pub leaf_index: u64,
}

/// A settled withdrawal. Handing `amount` to `recipient` is up to the caller
/// and happens after every state change below is already applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    pub recipient: Address,
    pub amount: u64,
    pub nullifier_hash: Field,
    /// Root the proof was made against
    pub merkle_root: Field,
    pub remainder: Option<Remainder>,
}

#[derive(Debug)]
struct PoolState<H> {
    tree: CommitmentTree<H>,
    history: RootHistory,
    nullifiers: NullifierRegistry,
    total_deposited: u64,
    total_withdrawn: u64,
}

impl<H: PoolHasher> PoolState<H> {
    fn balance(&self) -> u64 {
        self.total_deposited - self.total_withdrawn
    }

    /// Insert and record the new root together.
    fn insert_leaf(&mut self, leaf: Field) -> Result<u64, TreeError> {
        let index = self.tree.insert(leaf)?;
        self.history.record_root(self.tree.root());
        Ok(index)
    }
}

struct ProofChecked {
    public: PublicInputs,
}

struct RootChecked {
    public: PublicInputs,
}

struct NullifierReserved {
    public: PublicInputs,
}

pub struct Pool<H, V> {
    config: PoolConfig,
    hasher: H,
    verifier: V,
    capacity: u64,
    state: RwLock<PoolState<H>>,
}

impl<H: PoolHasher, V: ProofVerifier> Pool<H, V> {
    pub fn new(config: PoolConfig, hasher: H, verifier: V) -> Result<Self, PoolError> {
        config.validate()?;
        let tree = CommitmentTree::new(hasher.clone(), config.depth, config.zero_value);
        let history = RootHistory::new(config.root_history_size, tree.root());
        Ok(Self {
            capacity: tree.capacity(),
            state: RwLock::new(PoolState {
                tree,
                history,
                nullifiers: NullifierRegistry::new(),
                total_deposited: 0,
                total_withdrawn: 0,
            }),
            config,
            hasher,
            verifier,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    // ------------------------------------------------------------------
    // Deposits
    // ------------------------------------------------------------------

    /// Admit `amount` under `commitment`. The value bound into the
    /// commitment is the depositor's responsibility; the pool only checks
    /// the amount against its own limits.
    pub fn deposit(&self, commitment: Field, amount: u64) -> Result<DepositReceipt, PoolError> {
        if commitment.is_zero() {
            warn!("deposit rejected: zero commitment");
            return Err(PoolError::ZeroCommitment);
        }
        self.check_deposit_amount(amount)?;

        let mut state = self.write()?;
        let total = state
            .total_deposited
            .checked_add(amount)
            .ok_or(PoolError::InvalidAmount {
                amount,
                reason: "pool balance would overflow",
            })?;
        let leaf_index = state.insert_leaf(commitment).map_err(|e| {
            warn!(%commitment, "deposit rejected: {e}");
            PoolError::from(e)
        })?;
        state.total_deposited = total;
        let root = state.tree.root();
        drop(state);

        info!(%commitment, leaf_index, amount, %root, "deposit");
        Ok(DepositReceipt {
            commitment,
            leaf_index,
            amount,
            root,
        })
    }

    /// Deposit the full value of `note`.
    pub fn deposit_note(&self, note: &Note) -> Result<DepositReceipt, PoolError> {
        self.deposit(note.commitment(&self.hasher), note.value)
    }

    fn check_deposit_amount(&self, amount: u64) -> Result<(), PoolError> {
        if amount == 0 {
            return Err(PoolError::InvalidAmount {
                amount,
                reason: "deposit must be positive",
            });
        }
        match self.config.denomination {
            Some(d) if d != amount => Err(PoolError::InvalidAmount {
                amount,
                reason: "deposit must equal the pool denomination",
            }),
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Withdrawals
    // ------------------------------------------------------------------

    /// Run the withdrawal protocol for `proof`, paying `recipient`.
    ///
    /// Either every state change is applied (nullifier spent, remainder
    /// inserted, balance debited) or none is.
    pub fn withdraw(&self, proof: &[u8], recipient: Address) -> Result<WithdrawalReceipt, PoolError> {
        debug!(stage = ?WithdrawalStage::Received, proof_len = proof.len());
        let checked = self
            .check_proof(proof)
            .inspect_err(|e| reject(WithdrawalStage::Received, e))?;
        debug!(stage = ?WithdrawalStage::ProofChecked, nullifier_hash = %checked.public.nullifier_hash);

        let mut state = self.write()?;

        let checked = self
            .check_root(&state, checked)
            .inspect_err(|e| reject(WithdrawalStage::ProofChecked, e))?;
        debug!(stage = ?WithdrawalStage::RootChecked, root = %checked.public.merkle_root);

        let reserved = reserve_nullifier(&mut state, checked)
            .inspect_err(|e| reject(WithdrawalStage::RootChecked, e))?;
        debug!(stage = ?WithdrawalStage::NullifierReserved);

        let receipt = settle(&mut state, reserved, recipient)
            .inspect_err(|e| reject(WithdrawalStage::NullifierReserved, e))?;
        drop(state);

        debug!(stage = ?WithdrawalStage::Settled);
        info!(
            recipient = %receipt.recipient,
            amount = receipt.amount,
            nullifier_hash = %receipt.nullifier_hash,
            remainder = receipt.remainder.is_some(),
            "withdrawal"
        );
        Ok(receipt)
    }

    /// Received -> ProofChecked. Holds no lock.
    fn check_proof(&self, proof: &[u8]) -> Result<ProofChecked, PoolError> {
        let verified = self
            .verifier
            .verify(proof)
            .map_err(|e| PoolError::InvalidProof(e.to_string()))?;
        if !verified.valid {
            return Err(PoolError::InvalidProof("verifier rejected the proof".into()));
        }
        let public = PublicInputs::decode(&verified.public_inputs)
            .map_err(|e| PoolError::InvalidProof(format!("public inputs: {e}")))?;
        Ok(ProofChecked { public })
    }

    /// ProofChecked -> RootChecked.
    fn check_root(
        &self,
        state: &PoolState<H>,
        checked: ProofChecked,
    ) -> Result<RootChecked, PoolError> {
        let public = checked.public;
        let amount = public.withdraw_amount;
        if amount == 0 {
            return Err(PoolError::InvalidAmount {
                amount,
                reason: "withdrawal must be positive",
            });
        }
        if amount > self.config.withdrawal_bound() {
            return Err(PoolError::InvalidAmount {
                amount,
                reason: "withdrawal exceeds the pool bound",
            });
        }
        if !state.history.is_valid(&public.merkle_root) {
            return Err(PoolError::ExpiredOrUnknownRoot(public.merkle_root));
        }
        if amount > state.balance() {
            return Err(PoolError::InsufficientPoolBalance {
                requested: amount,
                available: state.balance(),
            });
        }
        Ok(RootChecked { public })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn root(&self) -> Result<Field, PoolError> {
        Ok(self.read()?.tree.root())
    }

    pub fn leaf_count(&self) -> Result<u64, PoolError> {
        Ok(self.read()?.tree.len())
    }

    pub fn depth(&self) -> usize {
        self.config.depth
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Total admitted minus total redeemed.
    pub fn balance(&self) -> Result<u64, PoolError> {
        Ok(self.read()?.balance())
    }

    pub fn has_commitment(&self, commitment: &Field) -> Result<bool, PoolError> {
        Ok(self.read()?.tree.contains(commitment))
    }

    pub fn leaf_index_of(&self, commitment: &Field) -> Result<Option<u64>, PoolError> {
        Ok(self.read()?.tree.index_of(commitment))
    }

    pub fn is_spent(&self, nullifier_hash: &Field) -> Result<bool, PoolError> {
        Ok(self.read()?.nullifiers.contains(nullifier_hash))
    }

    pub fn is_known_root(&self, root: &Field) -> Result<bool, PoolError> {
        Ok(self.read()?.history.is_valid(root))
    }

    /// Authentication path for the leaf at `leaf_index` against the current
    /// root.
    pub fn membership_proof(&self, leaf_index: u64) -> Result<MerkleProof, PoolError> {
        Ok(self.read()?.tree.prove_membership(leaf_index)?)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, PoolState<H>>, PoolError> {
        self.state.read().map_err(|_| PoolError::StatePoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, PoolState<H>>, PoolError> {
        self.state.write().map_err(|_| PoolError::StatePoisoned)
    }
}

/// RootChecked -> NullifierReserved. Must run after the root check so a
/// rejected request never consumes a nullifier.
fn reserve_nullifier<H: PoolHasher>(
    state: &mut PoolState<H>,
    checked: RootChecked,
) -> Result<NullifierReserved, PoolError> {
    let nullifier_hash = checked.public.nullifier_hash;
    if !state.nullifiers.check_and_reserve(nullifier_hash) {
        return Err(PoolError::NullifierReused(nullifier_hash));
    }
    Ok(NullifierReserved {
        public: checked.public,
    })
}

/// NullifierReserved -> Settled. A failed remainder insertion releases the
/// reservation, leaving the pool exactly as it was.
fn settle<H: PoolHasher>(
    state: &mut PoolState<H>,
    reserved: NullifierReserved,
    recipient: Address,
) -> Result<WithdrawalReceipt, PoolError> {
    let public = reserved.public;

    let remainder = match public.remainder_commitment() {
        Some(commitment) => match state.insert_leaf(commitment) {
            Ok(leaf_index) => Some(Remainder {
                commitment,
                leaf_index,
            }),
            Err(e) => {
                state.nullifiers.release(&public.nullifier_hash);
                warn!(nullifier_hash = %public.nullifier_hash, "nullifier reservation rolled back");
                return Err(match e {
                    TreeError::DuplicateLeaf(leaf) => PoolError::DuplicateNewCommitment(leaf),
                    other => other.into(),
                });
            }
        },
        None => None,
    };

    // Bounded by the balance check in check_root, under the same lock.
    state.total_withdrawn += public.withdraw_amount;

    Ok(WithdrawalReceipt {
        recipient,
        amount: public.withdraw_amount,
        nullifier_hash: public.nullifier_hash,
        merkle_root: public.merkle_root,
        remainder,
    })
}

fn reject(stage: WithdrawalStage, err: &PoolError) {
    warn!(?stage, kind = ?err.kind(), "withdrawal rejected: {err}");
}
