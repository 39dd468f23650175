//! # dsov-cli: Operator Tooling for the DataSov Bridge
//!
//! Provides the `dsov` command-line interface.
//!
//! ## Subcommands
//!
//! - `dsov keygen`: Ed25519 key pair generation (hex files).
//! - `dsov proof verify`: Offline signature and expiry check of a proof.
//! - `dsov sync`: Seed in-memory ledgers from a fixture and run the
//!   synchronizer.
//!
//! Handlers return an exit code; argument parsing lives in `main.rs`.

pub mod keygen;
pub mod proof;
pub mod sync;

use std::path::Path;

use anyhow::{Context, Result};

/// Read a whole file as UTF-8, naming the file on failure.
pub(crate) fn read_file(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {what}: {}", path.display()))
}
