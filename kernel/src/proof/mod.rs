//! Proof module: witness encoding, typed hash domains, state commitments.
//!
//! Depends on `carrier`. Nothing depends on `proof` within the kernel.

pub mod hash;
pub mod hash_domain;
pub mod witness;
