//! # dsov-ledger-client: Ledger Adapters
//!
//! Capability interfaces for the two ledgers the bridge connects, plus
//! in-memory implementations used by tests and the `dsov sync` fixture
//! runner.
//!
//! - [`IdentityLedger`] (Ledger A): read identities, submit contract
//!   transitions, enumerate changes, subscribe to events.
//! - [`Marketplace`] (Ledger B): listings and purchases gated by access
//!   proofs through an [`AccessGate`].
//! - [`with_retry`]: per-call timeout plus linear backoff on transient
//!   [`LedgerError`]s only.
//!
//! Ledger calls are the only suspension points in the system.

pub mod clock;
pub mod error;
pub mod event;
pub mod gate;
pub mod identity;
pub mod marketplace;
pub mod retry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::LedgerError;
pub use event::{LedgerEvent, LedgerEventType};
pub use gate::{validate_with_ledger, AccessGate, LedgerAccessGate};
pub use identity::{IdentityLedger, InMemoryIdentityLedger, InjectedFault};
pub use marketplace::{DataListing, InMemoryMarketplace, Marketplace};
pub use retry::{with_retry, RetryPolicy};
