//! `VmStateV1`: the VM state emitted by the step-execution engine.
//!
//! The engine writes this state to the terminal-state file when it stops,
//! and the absolute pre-state file uses the same schema. Memory is carried
//! only as its merkle root: the witness never needs the pages themselves.
//!
//! # JSON form
//!
//! ```text
//! {
//!   "memoryRoot": "0x…32 bytes…", "preimageKey": "0x…32 bytes…",
//!   "preimageOffset": 0, "pc": 0, "nextPC": 4, "lo": 0, "hi": 0,
//!   "heap": 0, "exit": 0, "exited": false, "step": 0,
//!   "registers": [0, …32 entries…]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::carrier::hexser;

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 32;

/// Halting status of a VM state, as committed to in byte 0 of its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum VmStatus {
    /// Exited with code 0.
    Valid = 0,
    /// Exited with code 1.
    Invalid = 1,
    /// Exited with any other code.
    Panic = 2,
    /// Still running.
    Unfinished = 3,
}

impl VmStatus {
    /// Derive the status from the exit flag and exit code.
    #[must_use]
    pub const fn from_exit(exited: bool, exit_code: u8) -> Self {
        if !exited {
            return Self::Unfinished;
        }
        match exit_code {
            0 => Self::Valid,
            1 => Self::Invalid,
            _ => Self::Panic,
        }
    }

    /// Convert to raw byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }
}

/// A complete VM state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmStateV1 {
    #[serde(with = "hexser::fixed32")]
    pub memory_root: [u8; 32],
    /// Key of the preimage the VM is currently reading, zero when idle.
    #[serde(with = "hexser::fixed32")]
    pub preimage_key: [u8; 32],
    pub preimage_offset: u32,
    pub pc: u32,
    #[serde(rename = "nextPC")]
    pub next_pc: u32,
    pub lo: u32,
    pub hi: u32,
    pub heap: u32,
    #[serde(rename = "exit")]
    pub exit_code: u8,
    pub exited: bool,
    /// Number of instructions executed so far. After the final instruction
    /// this is one past the last real trace index.
    pub step: u64,
    pub registers: [u32; REGISTER_COUNT],
}

impl VmStateV1 {
    #[must_use]
    pub const fn status(&self) -> VmStatus {
        VmStatus::from_exit(self.exited, self.exit_code)
    }
}
