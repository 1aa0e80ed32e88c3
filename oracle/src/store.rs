//! Proof Record Store: one proof record per trace index, plus the terminal
//! state the engine leaves behind when it stops.
//!
//! # Directory layout
//!
//! ```text
//! <dir>/
//!   proofs/<index>.json.gz   : ProofFileV1, one per materialized index
//!   final.json.gz            : VmStateV1 written by the engine on stop
//! ```
//!
//! The store is a keyed codec over the directory: no caching, no decisions.
//! A missing file surfaces as [`CodecError::NotFound`] and callers decide
//! what that means.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use steptrace_kernel::carrier::hexser;
use steptrace_kernel::carrier::vm_state::VmStateV1;
use steptrace_kernel::proof::hash::StateCommitment;
use steptrace_kernel::proof::witness::{encode_witness, WitnessError};

use crate::codec::{read_json, write_json, CodecError};

/// Subdirectory holding per-index proof records.
pub const PROOFS_DIR: &str = "proofs";
/// Extension of every proof record file.
pub const PROOF_FILE_EXT: &str = "json.gz";
/// Terminal-state file written by the engine.
pub const FINAL_STATE_FILE: &str = "final.json.gz";

/// A large out-of-band value the VM read during a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreimageRequest {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub offset: u32,
}

/// On-disk schema of a proof record, as written by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProofFileV1 {
    /// Missing in a truncated record; decodes as zero and is rejected
    /// when served.
    #[serde(rename = "post", default)]
    pub commitment: StateCommitment,
    #[serde(default, with = "hexser::bytes")]
    pub state_data: Vec<u8>,
    #[serde(
        default,
        with = "hexser::opt_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub proof_data: Option<Vec<u8>>,
    #[serde(
        default,
        with = "hexser::opt_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub oracle_key: Option<Vec<u8>>,
    #[serde(
        default,
        with = "hexser::opt_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub oracle_value: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_offset: Option<u32>,
}

/// A proof record for one trace index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRecordV1 {
    /// Commitment to the state after the step at this index.
    pub commitment: StateCommitment,
    /// Witness of the state before the step.
    pub pre_state: Vec<u8>,
    /// Step proof. `None` when the file omits it, which readers reject;
    /// `Some(vec![])` only for no-op extension records.
    pub step_proof: Option<Vec<u8>>,
    pub preimage: Option<PreimageRequest>,
}

impl ProofRecordV1 {
    /// The record every index past a terminated program maps to: the final
    /// state repeated unchanged, with no proof obligation.
    ///
    /// # Errors
    ///
    /// Returns [`WitnessError`] if the encoded state cannot be hashed.
    pub fn no_op_extension(state: &VmStateV1) -> Result<Self, WitnessError> {
        let witness = encode_witness(state);
        let commitment = witness.state_hash()?;
        Ok(Self {
            commitment,
            pre_state: witness.into_bytes(),
            step_proof: Some(Vec::new()),
            preimage: None,
        })
    }
}

impl From<ProofFileV1> for ProofRecordV1 {
    fn from(file: ProofFileV1) -> Self {
        // A non-empty key is the only signal that a preimage must be supplied.
        let preimage = match file.oracle_key {
            Some(key) if !key.is_empty() => Some(PreimageRequest {
                key,
                value: file.oracle_value.unwrap_or_default(),
                offset: file.oracle_offset.unwrap_or(0),
            }),
            _ => None,
        };
        Self {
            commitment: file.commitment,
            pre_state: file.state_data,
            step_proof: file.proof_data,
            preimage,
        }
    }
}

impl From<&ProofRecordV1> for ProofFileV1 {
    fn from(record: &ProofRecordV1) -> Self {
        let (oracle_key, oracle_value, oracle_offset) = match &record.preimage {
            Some(p) => (Some(p.key.clone()), Some(p.value.clone()), Some(p.offset)),
            None => (None, None, None),
        };
        Self {
            commitment: record.commitment,
            state_data: record.pre_state.clone(),
            proof_data: record.step_proof.clone(),
            oracle_key,
            oracle_value,
            oracle_offset,
        }
    }
}

/// Keyed access to the proof records and terminal state under a data directory.
#[derive(Debug, Clone)]
pub struct ProofStore {
    dir: PathBuf,
}

impl ProofStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn proof_path(&self, index: u64) -> PathBuf {
        proof_path(&self.dir, index)
    }

    #[must_use]
    pub fn final_state_path(&self) -> PathBuf {
        self.dir.join(FINAL_STATE_FILE)
    }

    /// Read the proof record for `index`.
    ///
    /// # Errors
    ///
    /// [`CodecError::NotFound`] if the index has not been materialized;
    /// any other [`CodecError`] means the file is unreadable or corrupt.
    pub fn read_proof(&self, index: u64) -> Result<ProofRecordV1, CodecError> {
        read_json::<ProofFileV1>(&self.proof_path(index)).map(ProofRecordV1::from)
    }

    /// Write (or overwrite) the proof record for `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] on encode or filesystem failure.
    pub fn write_proof(&self, index: u64, record: &ProofRecordV1) -> Result<(), CodecError> {
        write_json(&self.proof_path(index), &ProofFileV1::from(record))
    }

    /// Read the engine's terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the file is missing, unreadable, or corrupt.
    pub fn read_final_state(&self) -> Result<VmStateV1, CodecError> {
        read_json(&self.final_state_path())
    }
}

/// Path of the proof record for `index` under `dir`.
#[must_use]
pub fn proof_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(PROOFS_DIR).join(format!("{index}.{PROOF_FILE_EXT}"))
}
