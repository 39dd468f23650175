//! # dsov-bridge: Cross-Ledger Bridge
//!
//! The only stateful, concurrent component. It owns:
//!
//! - **Proof orchestration** (`bridge.rs`): generate identity and access
//!   proofs from Ledger A state and validate presented proofs against fresh
//!   reads. Fails closed when the ledger cannot be read.
//! - **Synchronizer** (`sync.rs`): one cycle at a time, partial-failure
//!   semantics, cooperative stop, periodic and event-driven scheduling.
//! - **Configuration** (`config.rs`): intervals, retry, timeouts, proof TTL.
//!
//! Adapters are chosen by the caller: pass in-memory or live
//! `Arc<dyn IdentityLedger>` / `Arc<dyn Marketplace>` to [`Bridge::new`].

pub mod bridge;
pub mod config;
pub mod error;
pub mod status;
pub mod sync;

#[cfg(test)]
mod testing;

pub use bridge::{Bridge, StateSnapshot};
pub use config::{BridgeConfig, ConfigError};
pub use error::BridgeError;
pub use status::{BridgeStatus, SyncItemError, SyncResult, SyncState};
pub use sync::{CycleOutcome, SyncStart};
