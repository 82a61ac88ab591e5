//! Adapters implementing the ledger ports.

pub mod json_file;
pub mod memory;
