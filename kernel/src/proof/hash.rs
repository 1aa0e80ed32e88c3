//! Canonical hashing and the 32-byte state commitment type.
//!
//! Algorithm: SHA-256 over `domain ‖ data` for every commitment.
//!
//! **Exactly one place defines canonical hashing.** The witness codec routes
//! through [`canonical_hash`]; nothing else in the workspace touches `sha2`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::carrier::hexser;
pub use crate::proof::hash_domain::HashDomain;

/// A 32-byte commitment to an encoded VM state.
///
/// The all-zero value never names a real state: readers treat it as the
/// mark of a malformed or partially-written record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StateCommitment([u8; 32]);

impl StateCommitment {
    /// The all-zero commitment.
    pub const ZERO: Self = Self([0; 32]);

    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32 bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }
}

impl fmt::Display for StateCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hexser::encode_prefixed(&self.0))
    }
}

impl Serialize for StateCommitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hexser::fixed32::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for StateCommitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        hexser::fixed32::deserialize(deserializer).map(Self)
    }
}

/// Compute the canonical SHA-256 digest of `data` under `domain`.
#[must_use]
pub fn canonical_hash(domain: HashDomain, data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(data);
    hasher.finalize().into()
}
