//! # dsov-state: Identity Ledger Contract
//!
//! The Identity Ledger owns `DigitalIdentity` records and their access
//! permissions. This crate defines those records and the contract that
//! guards every mutation of them.
//!
//! - **Records** (`record.rs`): `DigitalIdentity`, `AccessPermission`,
//!   and `has_access`, the predicate every access proof is derived from.
//! - **Contract** (`contract.rs`): Register, Verify, Update, Revoke,
//!   GrantAccess, RevokeAccess as pure checks over current and proposed
//!   records. Rejections name the first violated clause.
//! - **Oracle registry** (`oracle.rs`): staked KYC providers, slashing,
//!   and the active-oracle requirement for Verify.
//!
//! Nothing here performs I/O or reads the clock; callers pass `now`.

pub mod contract;
pub mod oracle;
pub mod record;

pub use contract::{
    apply, check_transition, propose, ContractClause, ContractViolation, Signatories, SignerRole,
    TransitionKind, TransitionRequest, MAX_DATA_TYPES_PER_GRANT,
};
pub use oracle::{KycOracle, OracleError, OracleRegistry};
pub use record::{AccessPermission, DigitalIdentity, PersonalInfo};
