use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::field::Field;
use crate::merkle::MAX_DEPTH;

pub const DEFAULT_TREE_DEPTH: usize = 20;
pub const DEFAULT_ROOT_HISTORY_SIZE: usize = 100;

/// Parameters fixed for the lifetime of a pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Merkle tree depth; capacity is `2^depth` leaves
    pub depth: usize,
    /// How many recent roots a withdrawal may reference
    pub root_history_size: usize,
    /// Padding for empty leaves
    pub zero_value: Field,
    /// If set, every deposit must be exactly this amount
    pub denomination: Option<u64>,
    /// Upper bound on a single withdrawal
    pub max_withdrawal: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_TREE_DEPTH,
            root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
            zero_value: Field::ZERO,
            denomination: None,
            max_withdrawal: u64::from(u32::MAX),
        }
    }
}

impl PoolConfig {
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_root_history_size(mut self, size: usize) -> Self {
        self.root_history_size = size;
        self
    }

    pub fn with_denomination(mut self, denomination: u64) -> Self {
        self.denomination = Some(denomination);
        self
    }

    pub fn with_max_withdrawal(mut self, max: u64) -> Self {
        self.max_withdrawal = max;
        self
    }

    /// Parse a JSON config and validate it. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PoolConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Largest amount a single withdrawal may claim: the denomination in a
    /// fixed-size pool, otherwise `max_withdrawal`.
    pub fn withdrawal_bound(&self) -> u64 {
        self.denomination
            .map_or(self.max_withdrawal, |d| d.min(self.max_withdrawal))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth == 0 || self.depth > MAX_DEPTH {
            return Err(ConfigError::InvalidDepth(self.depth));
        }
        if self.root_history_size == 0 {
            return Err(ConfigError::InvalidHistorySize);
        }
        if self.max_withdrawal == 0 {
            return Err(ConfigError::InvalidBound("max_withdrawal must be non-zero"));
        }
        if self.max_withdrawal > u64::from(u32::MAX) {
            return Err(ConfigError::InvalidBound(
                "max_withdrawal exceeds the 32-bit amount word",
            ));
        }
        match self.denomination {
            Some(0) => Err(ConfigError::InvalidBound("denomination must be non-zero")),
            Some(d) if d > self.max_withdrawal => Err(ConfigError::InvalidBound(
                "denomination exceeds max_withdrawal",
            )),
            _ => Ok(()),
        }
    }
}
