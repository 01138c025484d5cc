//! 256-bit field element used for every commitment, root and nullifier.

use core::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CodecError;

/// Number of 32-bit limbs in a field element.
pub const FIELD_LIMBS: usize = 8;

/// A 256-bit value stored big-endian.
///
/// The pool never does arithmetic on field elements; it only hashes,
/// compares and encodes them, so a plain byte array is enough.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Field(pub [u8; 32]);

impl Field {
    pub const ZERO: Field = Field([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Field(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Big-endian decomposition into eight 32-bit limbs; `limbs[0]` is the
    /// most significant.
    pub fn to_limbs(&self) -> [u32; FIELD_LIMBS] {
        let mut limbs = [0u32; FIELD_LIMBS];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let mut word = [0u8; 4];
            word.copy_from_slice(&self.0[i * 4..i * 4 + 4]);
            *limb = u32::from_be_bytes(word);
        }
        limbs
    }

    pub fn from_limbs(limbs: &[u32; FIELD_LIMBS]) -> Self {
        let mut bytes = [0u8; 32];
        for (i, limb) in limbs.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&limb.to_be_bytes());
        }
        Field(bytes)
    }

    /// Parse 32 bytes of hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(CodecError::WrongLength {
                expected: 32,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Field(arr))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<u64> for Field {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Field(bytes)
    }
}

impl From<[u8; 32]> for Field {
    fn from(bytes: [u8; 32]) -> Self {
        Field(bytes)
    }
}

impl From<Field> for [u8; 32] {
    fn from(value: Field) -> Self {
        value.0
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({self})")
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Field::from_hex(&s).map_err(de::Error::custom)
    }
}
