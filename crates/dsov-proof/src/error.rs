//! Errors raised while issuing or encoding proofs.
//!
//! A proof that fails validation is not an error; it produces a
//! [`ValidationResult`](crate::ValidationResult) listing `ProofFailure`s.

use thiserror::Error;

use dsov_core::{AccountId, CanonicalizationError, CryptoError, DataType, IdentityId, IdentityStatus};

#[derive(Error, Debug)]
pub enum ProofError {
    /// The proof body could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Identity proofs are only issued for VERIFIED identities.
    #[error("identity {identity_id} is {status}, not VERIFIED")]
    InvalidState {
        identity_id: IdentityId,
        status: IdentityStatus,
    },

    /// `has_access` was false at issuance time.
    #[error("{consumer} has no active access to {data_type} on identity {identity_id}")]
    AccessDenied {
        identity_id: IdentityId,
        consumer: AccountId,
        data_type: DataType,
    },

    /// The signer does not hold the identity provider's key.
    #[error("proof for provider {expected} cannot be signed by {actual}")]
    SignerMismatch {
        expected: AccountId,
        actual: AccountId,
    },

    /// The signing backend failed.
    #[error("signing failed: {0}")]
    Signing(#[from] CryptoError),

    /// `now + ttl` is not representable.
    #[error("proof TTL overflows the timestamp range")]
    TtlOverflow,
}
