//! Accounting core of an anonymity pool.
//!
//! Deposits append note commitments to a fixed-depth Merkle tree. A
//! withdrawal presents a proof that some unspent commitment sits under a
//! recent root; the pool checks the proof's public claims against its root
//! history and nullifier registry, marks the note spent, and optionally
//! inserts a commitment for the unspent remainder.
//!
//!   commitment    = H2(H2(value, secret), nullifier)
//!   nullifierHash = H1(nullifier)
//!
//! The hash function and the proof system are injected: see [`PoolHasher`]
//! and [`ProofVerifier`].

pub mod codec;
pub mod config;
pub mod error;
pub mod field;
pub mod hash;
pub mod history;
pub mod merkle;
pub mod note;
pub mod nullifier;
pub mod pool;
pub mod verifier;

pub use codec::{PublicInputs, PUBLIC_INPUT_WORDS};
pub use config::PoolConfig;
pub use error::{CodecError, ConfigError, PoolError, RejectionKind, TreeError, VerifierError};
pub use field::Field;
pub use hash::{keccak256, Keccak256Hasher, PoolHasher, Sha256Hasher};
pub use history::RootHistory;
pub use merkle::{compute_root, compute_zeros, verify_merkle_proof, CommitmentTree, MerkleProof};
pub use note::Note;
pub use nullifier::NullifierRegistry;
pub use pool::{Address, DepositReceipt, Pool, Remainder, WithdrawalReceipt, WithdrawalStage};
pub use verifier::{ProofVerifier, VerifiedProof, WithdrawWitness, WitnessVerifier};
