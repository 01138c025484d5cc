//! Error types for every layer of the pool.

use thiserror::Error;

use crate::field::Field;

/// Failures of the commitment tree itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("leaf {0} is already in the tree")]
    DuplicateLeaf(Field),

    #[error("tree is full ({capacity} leaves)")]
    TreeFull { capacity: u64 },

    #[error("leaf index {index} out of range (leaf count {leaf_count})")]
    LeafIndexOutOfRange { index: u64, leaf_count: u64 },
}

/// Failures converting between logical values and their wire encodings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("expected {expected} elements, got {got}")]
    WrongLength { expected: usize, got: usize },

    #[error("{field} value {value} does not fit in {bits} bits")]
    OutOfRange {
        field: &'static str,
        value: u64,
        bits: u32,
    },

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Rejected pool configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tree depth {0} must be between 1 and 32")]
    InvalidDepth(usize),

    #[error("root history size must be non-zero")]
    InvalidHistorySize,

    #[error("invalid amount bound: {0}")]
    InvalidBound(&'static str),

    #[error("config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a proof verifier backend.
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("verifier backend failed: {0}")]
    Backend(String),

    #[error("malformed proof: {0}")]
    Malformed(String),
}

/// Fieldless classification of a [`PoolError`], for clients that only need
/// to decide what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    InvalidProof,
    InvalidAmount,
    ExpiredOrUnknownRoot,
    NullifierReused,
    DuplicateLeaf,
    DuplicateNewCommitment,
    TreeFull,
    InsufficientPoolBalance,
    ZeroCommitment,
    LeafIndexOutOfRange,
    Config,
    StatePoisoned,
}

/// Every way a deposit, withdrawal or query against a pool can fail.
///
/// None of these are retried internally.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid proof: {0}")]
    InvalidProof(String),

    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: u64, reason: &'static str },

    #[error("merkle root {0} is expired or unknown")]
    ExpiredOrUnknownRoot(Field),

    #[error("nullifier hash {0} already spent")]
    NullifierReused(Field),

    #[error("commitment {0} already deposited")]
    DuplicateLeaf(Field),

    #[error("remainder commitment {0} already in the tree")]
    DuplicateNewCommitment(Field),

    #[error("commitment tree is full ({capacity} leaves)")]
    TreeFull { capacity: u64 },

    #[error("pool balance {available} cannot cover withdrawal of {requested}")]
    InsufficientPoolBalance { requested: u64, available: u64 },

    #[error("the zero commitment is reserved")]
    ZeroCommitment,

    #[error("leaf index {index} out of range (leaf count {leaf_count})")]
    LeafIndexOutOfRange { index: u64, leaf_count: u64 },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("pool state lock poisoned")]
    StatePoisoned,
}

impl PoolError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            PoolError::InvalidProof(_) => RejectionKind::InvalidProof,
            PoolError::InvalidAmount { .. } => RejectionKind::InvalidAmount,
            PoolError::ExpiredOrUnknownRoot(_) => RejectionKind::ExpiredOrUnknownRoot,
            PoolError::NullifierReused(_) => RejectionKind::NullifierReused,
            PoolError::DuplicateLeaf(_) => RejectionKind::DuplicateLeaf,
            PoolError::DuplicateNewCommitment(_) => RejectionKind::DuplicateNewCommitment,
            PoolError::TreeFull { .. } => RejectionKind::TreeFull,
            PoolError::InsufficientPoolBalance { .. } => RejectionKind::InsufficientPoolBalance,
            PoolError::ZeroCommitment => RejectionKind::ZeroCommitment,
            PoolError::LeafIndexOutOfRange { .. } => RejectionKind::LeafIndexOutOfRange,
            PoolError::Config(_) => RejectionKind::Config,
            PoolError::StatePoisoned => RejectionKind::StatePoisoned,
        }
    }
}

impl From<TreeError> for PoolError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::DuplicateLeaf(leaf) => PoolError::DuplicateLeaf(leaf),
            TreeError::TreeFull { capacity } => PoolError::TreeFull { capacity },
            TreeError::LeafIndexOutOfRange { index, leaf_count } => {
                PoolError::LeafIndexOutOfRange { index, leaf_count }
            }
        }
    }
}
