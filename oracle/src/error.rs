//! Typed oracle errors.
//!
//! A closed taxonomy the client can match on. Every variant names the trace
//! index or file it concerns and keeps the underlying cause as its source.
//!
//! Storage misses never appear here: they are consumed inside
//! [`crate::provider::TraceProvider`] to decide between generation and
//! trace extension.

use std::path::PathBuf;

use steptrace_kernel::proof::witness::WitnessError;
use thiserror::Error;

use crate::codec::CodecError;
use crate::contract::{EngineError, TraceIndex};

#[derive(Debug, Error)]
pub enum OracleError {
    /// The requested index does not fit in `u64`.
    #[error("trace index {index} out of bounds")]
    InvalidIndex { index: TraceIndex },

    /// The stored record carries the zero hash.
    #[error("proof at trace index {index} missing post hash")]
    MissingCommitment { index: u64 },

    /// The stored record has an empty pre-state witness.
    #[error("proof at trace index {index} missing state data")]
    MissingWitness { index: u64 },

    /// The stored record has no step proof field at all.
    #[error("proof at trace index {index} missing proof data")]
    MissingProof { index: u64 },

    #[error("cannot load absolute pre-state {}: {source}", path.display())]
    PreStateLoad {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("cannot hash witness: {0}")]
    Hash(#[from] WitnessError),

    /// The engine failed; the query may be retried later as a whole.
    #[error("generate trace with proof at {index}: {source}")]
    ProofGeneration {
        index: u64,
        #[source]
        source: EngineError,
    },

    /// The engine succeeded without producing the record, and the program
    /// has not plausibly ended before `requested`.
    #[error(
        "expected proof not generated but final state was not exited, \
         requested step {requested}, final state at step {final_step} (exited: {exited})"
    )]
    InconsistentTrace {
        requested: u64,
        final_step: u64,
        exited: bool,
    },

    #[error("cannot read final state: {0}")]
    FinalState(#[source] CodecError),

    /// The proof file exists but could not be opened.
    #[error("cannot open proof file at trace index {index}: {source}")]
    ProofUnreadable {
        index: u64,
        #[source]
        source: CodecError,
    },

    /// The proof file exists but does not decode.
    #[error("failed to read proof at trace index {index}: {source}")]
    CorruptProofRecord {
        index: u64,
        #[source]
        source: CodecError,
    },
}
