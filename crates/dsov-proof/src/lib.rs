//! # dsov-proof: Cross-Ledger Proof Codec
//!
//! Builds and checks the two attestations the marketplace accepts from the
//! identity ledger:
//!
//! - [`IdentityProof`]: identity VERIFIED at a given level.
//! - [`AccessProof`]: a consumer holds an active permission for a data type.
//!
//! Both are signed by the identity provider over canonical JSON of every
//! field but `signature`. Issuance and the checks here are pure and never
//! suspend; reading current ledger state is the caller's job, passed in as
//! a [`LedgerView`].
//!
//! Validation failures are values ([`ProofFailure`] in a
//! [`ValidationResult`]), never errors. [`ProofError`] covers issuance.

pub mod access;
pub mod error;
pub mod identity;
pub mod result;
pub mod signed;

pub use access::AccessProof;
pub use error::ProofError;
pub use identity::IdentityProof;
pub use result::{ProofFailure, ValidationResult};
pub use signed::{LedgerView, SignedProof};
