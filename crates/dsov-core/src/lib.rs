//! # dsov-core: Foundational Types for the DataSov Bridge
//!
//! Every other crate in the workspace depends on `dsov-core`; it depends on
//! nothing internal. It defines the primitives that the identity contract,
//! the proof codec, and the cross-ledger bridge share.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `IdentityId`, `AccountId`,
//!    `TxRef` are validated at construction. No bare strings cross a crate
//!    boundary where an identifier is meant.
//!
//! 2. **`CanonicalBytes` newtype.** Every signed or hashed payload flows
//!    through `CanonicalBytes::new()`. Two parties that serialize the same
//!    proof body always sign and verify the same bytes.
//!
//! 3. **Closed enums for ledger vocabulary.** `IdentityStatus`,
//!    `VerificationLevel`, `PermissionType`, `DataType` are exhaustive; a new
//!    variant forces every `match` in the workspace to handle it.
//!
//! 4. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision so
//!    that proof bodies canonicalize identically on every node.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dsov-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod domain;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use domain::{DataType, IdentityStatus, IdentityType, PermissionType, VerificationLevel};
pub use error::{CanonicalizationError, CryptoError, DsovError, ValidationError};
pub use identity::{AccountId, IdentityId, ListingId, TxRef};
pub use temporal::Timestamp;
