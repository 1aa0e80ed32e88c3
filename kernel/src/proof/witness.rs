//! Witness codec: canonical byte encoding of a [`VmStateV1`] and its commitment.
//!
//! Both functions are pure. Identical states always produce identical
//! witnesses and identical commitments; the dispute game depends on it.
//!
//! # Layout (226 bytes, integers big-endian)
//!
//! ```text
//! offset  len  field
//!      0   32  memory_root
//!     32   32  preimage_key
//!     64    4  preimage_offset
//!     68    4  pc
//!     72    4  next_pc
//!     76    4  lo
//!     80    4  hi
//!     84    4  heap
//!     88    1  exit_code
//!     89    1  exited (0 or 1)
//!     90    8  step
//!     98  128  registers[0..32]
//! ```

use thiserror::Error;

use crate::carrier::vm_state::{VmStateV1, VmStatus};
use crate::proof::hash::{canonical_hash, HashDomain, StateCommitment};

/// Exact byte length of an encoded witness.
pub const WITNESS_LEN: usize = 226;

const EXIT_CODE_OFFSET: usize = 88;
const EXITED_OFFSET: usize = 89;

/// Errors from hashing a witness.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WitnessError {
    #[error("invalid witness length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid exited flag in witness: {value}")]
    InvalidExitedFlag { value: u8 },
}

/// An encoded VM state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateWitness(Vec<u8>);

impl StateWitness {
    /// Wrap raw witness bytes. Length is checked when hashing, not here.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Commitment to this witness. See [`state_hash`].
    ///
    /// # Errors
    ///
    /// Returns [`WitnessError`] if the bytes are not a well-formed witness.
    pub fn state_hash(&self) -> Result<StateCommitment, WitnessError> {
        state_hash(&self.0)
    }
}

/// Encode a state into its canonical witness.
#[must_use]
pub fn encode_witness(state: &VmStateV1) -> StateWitness {
    let mut buf = Vec::with_capacity(WITNESS_LEN);
    buf.extend_from_slice(&state.memory_root);
    buf.extend_from_slice(&state.preimage_key);
    buf.extend_from_slice(&state.preimage_offset.to_be_bytes());
    buf.extend_from_slice(&state.pc.to_be_bytes());
    buf.extend_from_slice(&state.next_pc.to_be_bytes());
    buf.extend_from_slice(&state.lo.to_be_bytes());
    buf.extend_from_slice(&state.hi.to_be_bytes());
    buf.extend_from_slice(&state.heap.to_be_bytes());
    buf.push(state.exit_code);
    buf.push(u8::from(state.exited));
    buf.extend_from_slice(&state.step.to_be_bytes());
    for reg in &state.registers {
        buf.extend_from_slice(&reg.to_be_bytes());
    }
    debug_assert_eq!(buf.len(), WITNESS_LEN);
    StateWitness(buf)
}

/// Compute the commitment for a witness.
///
/// `SHA-256(StateWitness domain ‖ witness)`, with byte 0 replaced by the
/// [`VmStatus`] read back out of the witness.
///
/// # Errors
///
/// - [`WitnessError::InvalidLength`] if `witness` is not [`WITNESS_LEN`] bytes.
/// - [`WitnessError::InvalidExitedFlag`] if the exited byte is not 0 or 1.
pub fn state_hash(witness: &[u8]) -> Result<StateCommitment, WitnessError> {
    if witness.len() != WITNESS_LEN {
        return Err(WitnessError::InvalidLength {
            expected: WITNESS_LEN,
            actual: witness.len(),
        });
    }
    let exited = match witness[EXITED_OFFSET] {
        0 => false,
        1 => true,
        value => return Err(WitnessError::InvalidExitedFlag { value }),
    };
    let status = VmStatus::from_exit(exited, witness[EXIT_CODE_OFFSET]);

    let mut digest = canonical_hash(HashDomain::StateWitness, witness);
    digest[0] = status.to_byte();
    Ok(StateCommitment::from_bytes(digest))
}
