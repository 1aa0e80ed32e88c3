//! Trace Provider: answers commitment and step-data queries for any trace
//! index, generating proofs on demand and extending a terminated trace with
//! no-op steps.
//!
//! # Query pipeline
//!
//! ```text
//! index → last-step clamp → store read
//!   ├─ hit                         → record
//!   └─ miss → engine → store read
//!        ├─ hit                    → record
//!        └─ miss → final state
//!             ├─ exited, step ≤ i  → synthesize no-op record, cache boundary
//!             └─ otherwise         → InconsistentTrace
//! ```
//!
//! Once the boundary is known, every index at or past it collapses onto the
//! one terminal record. That record is kept in memory as well as on disk, so
//! a failed cache write never lets a later query fall through to the engine.
//! If only the marker survived (a restart after a failed record write), the
//! engine is asked for the index just past the boundary, which re-derives
//! the terminal state instead of a real step record.
//! Methods take `&mut self`, so queries against one provider (and thus one
//! data directory) are serialized and never race to invoke the engine.

use std::path::{Path, PathBuf};

use steptrace_kernel::carrier::vm_state::VmStateV1;
use steptrace_kernel::proof::hash::StateCommitment;
use steptrace_kernel::proof::witness::{encode_witness, StateWitness};
use tracing::{debug, error, instrument, warn};

use crate::codec::{read_json, CodecError};
use crate::config::OracleConfig;
use crate::contract::{StepData, StepEngine, TraceIndex, TraceOracle};
use crate::error::OracleError;
use crate::executor::CommandEngine;
use crate::last_step::LastStepCache;
use crate::store::{ProofRecordV1, ProofStore};

pub struct TraceProvider<E> {
    dir: PathBuf,
    prestate: PathBuf,
    store: ProofStore,
    last_step_cache: LastStepCache,
    engine: E,
    max_depth: u64,
    /// Last trace index backed by a real instruction, once discovered.
    /// Advisory: always re-derivable from disk.
    last_step: Option<u64>,
    /// No-op record synthesized for `last_step` by this instance.
    terminal: Option<ProofRecordV1>,
}

impl TraceProvider<CommandEngine> {
    /// Provider backed by the configured VM binary.
    #[must_use]
    pub fn from_config(config: &OracleConfig) -> Self {
        let engine = CommandEngine::new(config.engine.clone(), &config.absolute_pre_state);
        Self::new(
            &config.data_dir,
            &config.absolute_pre_state,
            config.max_depth,
            engine,
        )
    }
}

impl<E: StepEngine> TraceProvider<E> {
    #[must_use]
    pub fn new(
        dir: impl Into<PathBuf>,
        prestate: impl Into<PathBuf>,
        max_depth: u64,
        engine: E,
    ) -> Self {
        let dir = dir.into();
        Self {
            store: ProofStore::new(dir.clone()),
            last_step_cache: LastStepCache::new(&dir),
            dir,
            prestate: prestate.into(),
            engine,
            max_depth,
            last_step: None,
            terminal: None,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn max_depth(&self) -> u64 {
        self.max_depth
    }

    #[must_use]
    pub fn last_step(&self) -> Option<u64> {
        self.last_step
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Load the proof record for `index`, generating it if needed.
    ///
    /// Indices past the end of a terminated program resolve to the no-op
    /// extension record stored under the last real index.
    ///
    /// # Errors
    ///
    /// - [`OracleError::ProofGeneration`] if the engine fails.
    /// - [`OracleError::InconsistentTrace`] if the engine produced nothing
    ///   and the program has not exited at or before `index`.
    /// - [`OracleError::CorruptProofRecord`] / [`OracleError::ProofUnreadable`]
    ///   for a record file that exists but cannot be used.
    /// - [`OracleError::FinalState`] if the terminal state cannot be read.
    #[instrument(level = "debug", skip(self))]
    pub fn load_proof(&mut self, index: u64) -> Result<ProofRecordV1, OracleError> {
        if self.last_step.is_none() {
            match self.last_step_cache.read() {
                Ok(step) => self.last_step = Some(step),
                Err(err) if err.is_not_found() => {}
                Err(err) => warn!(%err, "Failed to read last step from disk cache"),
            }
        }
        let (index, at_boundary) = match self.last_step {
            Some(last) if index >= last => {
                if index > last {
                    debug!(last, "Clamping request to last step");
                }
                (last, true)
            }
            _ => (index, false),
        };

        match self.store.read_proof(index) {
            Ok(record) => return Ok(record),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(read_failure(index, err)),
        }

        if at_boundary {
            if let Some(record) = &self.terminal {
                debug!(last = index, "Serving terminal record from memory");
                return Ok(record.clone());
            }
            return self.rediscover_boundary(index);
        }

        self.engine
            .generate_proof(&self.dir, index)
            .map_err(|source| OracleError::ProofGeneration { index, source })?;

        match self.store.read_proof(index) {
            Ok(record) => Ok(record),
            Err(err) if err.is_not_found() => self.extend_past_exit(index),
            Err(err) => Err(read_failure(index, err)),
        }
    }

    /// The marker names `last` as the boundary but its record is gone. Run
    /// the engine one step past it: an exited program leaves only the final
    /// state, and the usual synthesis rebuilds and re-persists the record.
    fn rediscover_boundary(&mut self, last: u64) -> Result<ProofRecordV1, OracleError> {
        let past = last.saturating_add(1);
        warn!(last, "Last step record missing, re-deriving terminal state");
        self.engine
            .generate_proof(&self.dir, past)
            .map_err(|source| OracleError::ProofGeneration {
                index: past,
                source,
            })?;
        self.extend_past_exit(past)
    }

    /// The engine stopped short of `index`: synthesize the no-op record if
    /// the program really has exited.
    fn extend_past_exit(&mut self, index: u64) -> Result<ProofRecordV1, OracleError> {
        let state: VmStateV1 = self
            .store
            .read_final_state()
            .map_err(OracleError::FinalState)?;
        if !state.exited || state.step > index {
            error!(
                requested = index,
                final_step = state.step,
                exited = state.exited,
                "Expected proof not generated"
            );
            return Err(OracleError::InconsistentTrace {
                requested: index,
                final_step: state.step,
                exited: state.exited,
            });
        }
        warn!(
            proof = index,
            last = state.step,
            status = ?state.status(),
            "Requested proof was after the program exited"
        );

        // The final instruction is already applied to this state, so the last
        // real index is one before its step count.
        let last_step = state.step.saturating_sub(1);
        self.last_step = Some(last_step);
        let record = ProofRecordV1::no_op_extension(&state)?;
        self.terminal = Some(record.clone());

        if let Err(err) = self.last_step_cache.write(last_step) {
            warn!(step = last_step, %err, "Failed to write last step to disk cache");
        }
        if let Err(err) = self.store.write_proof(last_step, &record) {
            warn!(step = last_step, %err, "Failed to write extension proof to disk cache");
        }
        Ok(record)
    }

    fn resolve(index: TraceIndex) -> Result<u64, OracleError> {
        index.to_u64().ok_or(OracleError::InvalidIndex { index })
    }
}

fn read_failure(index: u64, source: CodecError) -> OracleError {
    match source {
        CodecError::Decode { .. } => OracleError::CorruptProofRecord { index, source },
        _ => OracleError::ProofUnreadable { index, source },
    }
}

impl<E: StepEngine> TraceOracle for TraceProvider<E> {
    fn commitment_at(&mut self, index: TraceIndex) -> Result<StateCommitment, OracleError> {
        let index = Self::resolve(index)?;
        let record = self.load_proof(index)?;
        if record.commitment.is_zero() {
            return Err(OracleError::MissingCommitment { index });
        }
        Ok(record.commitment)
    }

    fn step_data_at(&mut self, index: TraceIndex) -> Result<StepData, OracleError> {
        let index = Self::resolve(index)?;
        let record = self.load_proof(index)?;
        if record.pre_state.is_empty() {
            return Err(OracleError::MissingWitness { index });
        }
        let Some(proof) = record.step_proof else {
            return Err(OracleError::MissingProof { index });
        };
        Ok(StepData {
            pre_state: record.pre_state,
            proof,
            preimage: record.preimage,
        })
    }

    fn absolute_pre_state(&self) -> Result<Vec<u8>, OracleError> {
        let state: VmStateV1 =
            read_json(&self.prestate).map_err(|source| OracleError::PreStateLoad {
                path: self.prestate.clone(),
                source,
            })?;
        Ok(encode_witness(&state).into_bytes())
    }

    fn absolute_pre_state_commitment(&self) -> Result<StateCommitment, OracleError> {
        let witness = StateWitness::from_bytes(self.absolute_pre_state()?);
        Ok(witness.state_hash()?)
    }

    fn set_max_depth(&mut self, max_depth: u64) {
        self.max_depth = max_depth;
    }
}
