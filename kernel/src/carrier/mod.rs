//! Carrier module: the VM state and its JSON representation.

pub mod hexser;
pub mod vm_state;
