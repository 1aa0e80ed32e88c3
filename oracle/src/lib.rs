//! Steptrace Oracle: the trace oracle consulted by a dispute-game client.
//!
//! Given a trace index, the oracle returns the commitment claimed there and
//! the witness, proof, and preimage request needed to verify that one step.
//! Proofs are materialized on demand by an external step-execution engine
//! and cached on disk; positions past the end of a terminated program are
//! answered with a no-op extension of its final state.
//!
//! The oracle does NOT execute the VM or hash states itself: execution is
//! the engine's job, witnesses and commitments are the kernel's.
//!
//! # Crate dependency graph
//!
//! ```text
//! steptrace_kernel  ←  steptrace_oracle
//! (state, witness)     (codec, store, cache, engine, provider)
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod config;
pub mod contract;
pub mod error;
pub mod executor;
pub mod last_step;
pub mod provider;
pub mod store;
