//! Trace oracle contracts: the capability the provider consumes (the
//! step-execution engine) and the surface it offers the dispute-game client.
//!
//! The engine does NOT:
//! - decide whether an index lies past the end of the trace (provider's job)
//! - cache anything the provider reads back (store's job)
//!
//! The client does NOT map tree positions here: it hands over a resolved
//! [`TraceIndex`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use steptrace_kernel::proof::hash::StateCommitment;
use thiserror::Error;

use crate::error::OracleError;
use crate::store::PreimageRequest;

/// Typed failure from the step-execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine process could not be started.
    #[error("cannot launch {}: {source}", executable.display())]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The engine ran and reported failure.
    #[error("engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    /// Output directories could not be prepared.
    #[error("cannot prepare {}: {source}", path.display())]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A snapshot file name does not encode a trace index.
    #[error("unable to parse trace index of snapshot file: {name}")]
    InvalidSnapshot { name: String },
    /// Engine-specific failure.
    #[error("{detail}")]
    Other { detail: String },
}

/// The step-execution engine.
///
/// Postcondition of a successful [`generate_proof`](Self::generate_proof):
/// either the proof record for `proof_at` exists under `dir`, or the
/// terminal-state file exists with `exited == true` and `step <= proof_at`.
/// Records for lower indices may be written as a side effect.
///
/// Implementations must produce each file atomically: the provider trusts
/// any file it finds, and treats only absence as a negative answer.
pub trait StepEngine {
    /// Materialize the proof record for `proof_at` under `dir`.
    ///
    /// May run for minutes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if execution could not complete.
    fn generate_proof(&mut self, dir: &Path, proof_at: u64) -> Result<(), EngineError>;
}

/// A resolved position in the execution trace.
///
/// Wider than `u64` because deep games resolve positions past that range;
/// the provider rejects anything it cannot represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraceIndex(u128);

impl TraceIndex {
    #[must_use]
    pub const fn new(index: u128) -> Self {
        Self(index)
    }

    /// The index as `u64`, or `None` if it does not fit.
    #[must_use]
    pub fn to_u64(self) -> Option<u64> {
        u64::try_from(self.0).ok()
    }
}

impl From<u64> for TraceIndex {
    fn from(index: u64) -> Self {
        Self(u128::from(index))
    }
}

impl fmt::Display for TraceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to verify one step on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepData {
    /// Witness of the state before the step.
    pub pre_state: Vec<u8>,
    /// Step proof; empty only past the end of a terminated program.
    pub proof: Vec<u8>,
    pub preimage: Option<PreimageRequest>,
}

/// The oracle surface consulted by the dispute-game client.
pub trait TraceOracle {
    /// Commitment claimed after the step at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] if the index is unrepresentable or the record
    /// cannot be loaded, generated, or trusted.
    fn commitment_at(&mut self, index: TraceIndex) -> Result<StateCommitment, OracleError>;

    /// Pre-state witness, step proof, and preimage request for `index`.
    ///
    /// # Errors
    ///
    /// As [`commitment_at`](Self::commitment_at), plus missing witness or proof.
    fn step_data_at(&mut self, index: TraceIndex) -> Result<StepData, OracleError>;

    /// Witness of the game's genesis state.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::PreStateLoad`] if the pre-state file is unusable.
    fn absolute_pre_state(&self) -> Result<Vec<u8>, OracleError>;

    /// Commitment to the game's genesis state.
    ///
    /// # Errors
    ///
    /// As [`absolute_pre_state`](Self::absolute_pre_state), plus hashing failure.
    fn absolute_pre_state_commitment(&self) -> Result<StateCommitment, OracleError>;

    /// Update the maximum game depth. No I/O.
    fn set_max_depth(&mut self, max_depth: u64);
}
