//! `ScriptedEngine`: a deterministic stand-in for the VM binary.
//!
//! It models a toy program of `program_len` real instructions. State `k` is
//! the state after `k` instructions; the program halts (if it halts) in state
//! `program_len`. For each request the engine writes exactly what a real
//! engine run with `--proof-at =i --stop-at =i+1` would:
//!
//! - `i < program_len`: the proof record for `i`, and final state `i + 1`
//! - otherwise: only the final state `program_len`
//!
//! Invocations are recorded so tests can prove the engine was NOT consulted.

use std::path::Path;

use steptrace_kernel::carrier::vm_state::{VmStateV1, REGISTER_COUNT};
use steptrace_kernel::proof::witness::encode_witness;
use steptrace_oracle::codec::write_json;
use steptrace_oracle::contract::{EngineError, StepEngine};
use steptrace_oracle::store::{PreimageRequest, ProofRecordV1, ProofStore, FINAL_STATE_FILE};

/// How the engine responds to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineBehavior {
    /// Writes what a correct engine writes.
    Honest,
    /// Reports success but writes only the program's true final state.
    DropProofs,
    /// Reports failure and writes nothing.
    Fail,
}

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    program_len: u64,
    exits: bool,
    behavior: EngineBehavior,
    calls: Vec<u64>,
}

impl ScriptedEngine {
    /// An honest engine for a program that exits after `program_len` steps.
    #[must_use]
    pub fn new(program_len: u64) -> Self {
        Self {
            program_len,
            exits: true,
            behavior: EngineBehavior::Honest,
            calls: Vec::new(),
        }
    }

    /// The program is still running after `program_len` steps.
    #[must_use]
    pub fn never_exits(mut self) -> Self {
        self.exits = false;
        self
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: EngineBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Indices the engine was asked to prove, in order.
    #[must_use]
    pub fn calls(&self) -> &[u64] {
        &self.calls
    }

    /// State after `step` instructions.
    #[must_use]
    pub fn state(&self, step: u64) -> VmStateV1 {
        toy_state(step, self.exits && step >= self.program_len)
    }

    /// The record an honest engine writes for real index `index`.
    ///
    /// # Panics
    ///
    /// Never for toy states: their witnesses are always well-formed.
    #[must_use]
    pub fn expected_record(&self, index: u64) -> ProofRecordV1 {
        let pre = encode_witness(&self.state(index));
        let post = encode_witness(&self.state(index + 1));
        ProofRecordV1 {
            commitment: post.state_hash().expect("toy witness hashes"),
            pre_state: pre.into_bytes(),
            step_proof: Some(index.to_be_bytes().repeat(4)),
            preimage: (index % 4 == 3).then(|| preimage_for(index)),
        }
    }

    /// Commitment of the program's final state.
    ///
    /// # Panics
    ///
    /// Never for toy states: their witnesses are always well-formed.
    #[must_use]
    pub fn final_commitment(&self) -> steptrace_kernel::proof::hash::StateCommitment {
        encode_witness(&self.state(self.program_len))
            .state_hash()
            .expect("toy witness hashes")
    }

    fn write_final(&self, dir: &Path, step: u64) -> Result<(), EngineError> {
        write_json(&dir.join(FINAL_STATE_FILE), &self.state(step)).map_err(to_engine_error)
    }
}

impl StepEngine for ScriptedEngine {
    fn generate_proof(&mut self, dir: &Path, proof_at: u64) -> Result<(), EngineError> {
        self.calls.push(proof_at);
        match self.behavior {
            EngineBehavior::Fail => Err(EngineError::Other {
                detail: format!("scripted failure at {proof_at}"),
            }),
            EngineBehavior::DropProofs => self.write_final(dir, self.program_len),
            EngineBehavior::Honest if proof_at < self.program_len => {
                ProofStore::new(dir)
                    .write_proof(proof_at, &self.expected_record(proof_at))
                    .map_err(to_engine_error)?;
                self.write_final(dir, proof_at + 1)
            }
            EngineBehavior::Honest => self.write_final(dir, self.program_len),
        }
    }
}

/// Deterministic toy state after `step` instructions.
#[must_use]
pub fn toy_state(step: u64, exited: bool) -> VmStateV1 {
    let low = u32::try_from(step & 0xffff_ffff).unwrap_or(u32::MAX);
    let mut registers = [0u32; REGISTER_COUNT];
    registers[2] = low;
    registers[29] = 0x7fff_f000;
    let mut memory_root = [0u8; 32];
    memory_root[24..].copy_from_slice(&step.to_be_bytes());
    VmStateV1 {
        memory_root,
        pc: 0x0040_0000_u32.wrapping_add(low.wrapping_mul(4)),
        next_pc: 0x0040_0004_u32.wrapping_add(low.wrapping_mul(4)),
        heap: 0x2000_0000,
        exited,
        step,
        registers,
        ..VmStateV1::default()
    }
}

fn preimage_for(index: u64) -> PreimageRequest {
    let mut key = vec![0x02; 32];
    key[24..].copy_from_slice(&index.to_be_bytes());
    let mut value = 4u64.to_be_bytes().to_vec();
    value.extend_from_slice(b"data");
    PreimageRequest {
        key,
        value,
        offset: 0,
    }
}

fn to_engine_error(err: steptrace_oracle::codec::CodecError) -> EngineError {
    EngineError::Other {
        detail: err.to_string(),
    }
}
