//! Bridge errors.

use thiserror::Error;

use dsov_core::{AccountId, DataType, IdentityId, IdentityStatus};
use dsov_ledger_client::LedgerError;
use dsov_proof::ProofError;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("identity {identity_id} not found on the identity ledger")]
    IdentityNotFound { identity_id: IdentityId },

    /// Identity proofs require a VERIFIED identity.
    #[error("identity {identity_id} is {status}, not VERIFIED")]
    InvalidState {
        identity_id: IdentityId,
        status: IdentityStatus,
    },

    /// `has_access` is false for the requested triple.
    #[error("{consumer} has no active access to {data_type} on identity {identity_id}")]
    AccessDenied {
        identity_id: IdentityId,
        consumer: AccountId,
        data_type: DataType,
    },

    /// The bridge holds no signing capability for this provider.
    #[error("no signer available for identity provider {provider}")]
    SignerUnavailable { provider: AccountId },

    #[error("proof error: {0}")]
    Proof(ProofError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ProofError> for BridgeError {
    fn from(e: ProofError) -> Self {
        match e {
            ProofError::InvalidState {
                identity_id,
                status,
            } => Self::InvalidState {
                identity_id,
                status,
            },
            ProofError::AccessDenied {
                identity_id,
                consumer,
                data_type,
            } => Self::AccessDenied {
                identity_id,
                consumer,
                data_type,
            },
            other => Self::Proof(other),
        }
    }
}
