//! Steptrace Kernel: the deterministic, I/O-free core of the trace oracle.
//!
//! # API Surface
//!
//! - [`carrier::vm_state::VmStateV1`] -- the VM state the execution engine emits
//! - [`proof::witness::encode_witness`] -- canonical witness encoding of a state
//! - [`proof::witness::state_hash`] -- the commitment claimed for a witness
//!
//! # Module Dependency Direction
//!
//! `carrier` ← `proof`
//!
//! One-way only. `proof` depends on `carrier`. `carrier` depends on nothing internal.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod carrier;
pub mod proof;
