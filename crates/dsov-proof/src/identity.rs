//! # Identity Proof
//!
//! Attests that an identity was VERIFIED at a given level when the proof
//! was issued. Validation re-reads the ledger, so a revocation after
//! issuance invalidates the proof.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use dsov_core::{AccountId, IdentityId, IdentityStatus, Timestamp, TxRef, VerificationLevel};
use dsov_crypto::{Ed25519Signature, ProofSigner};
use dsov_state::DigitalIdentity;

use crate::error::ProofError;
use crate::result::ProofFailure;
use crate::signed::{past, SignedProof};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProof {
    pub identity_id: IdentityId,
    pub owner: AccountId,
    pub issuer: AccountId,
    pub verification_level: VerificationLevel,
    pub verification_timestamp: Timestamp,
    pub source_transaction_ref: TxRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Timestamp>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub signature: Ed25519Signature,
}

impl IdentityProof {
    /// Issue a proof for a VERIFIED identity, valid for `ttl` from `now`.
    ///
    /// `signer` must hold the key of the identity's provider.
    pub fn issue(
        identity: &DigitalIdentity,
        source_transaction_ref: TxRef,
        signer: &dyn ProofSigner,
        now: Timestamp,
        ttl: Duration,
    ) -> Result<Self, ProofError> {
        if identity.status != IdentityStatus::Verified {
            return Err(ProofError::InvalidState {
                identity_id: identity.identity_id.clone(),
                status: identity.status,
            });
        }
        if signer.signer_id() != &identity.identity_provider {
            return Err(ProofError::SignerMismatch {
                expected: identity.identity_provider.clone(),
                actual: signer.signer_id().clone(),
            });
        }
        let valid_until = now.checked_add(ttl).ok_or(ProofError::TtlOverflow)?;

        let mut metadata = BTreeMap::new();
        metadata.insert("identityType".to_string(), identity.identity_type.to_string());
        if let Some(method) = &identity.verification_method {
            metadata.insert("verificationMethod".to_string(), method.clone());
        }

        let mut proof = Self {
            identity_id: identity.identity_id.clone(),
            owner: identity.owner.clone(),
            issuer: identity.identity_provider.clone(),
            verification_level: identity.verification_level,
            verification_timestamp: now,
            source_transaction_ref,
            valid_until: Some(valid_until),
            metadata,
            signature: Ed25519Signature::from_bytes([0; 64]),
        };
        proof.signature = signer.sign(&proof.signing_input()?)?;

        info!(
            identity_id = %proof.identity_id,
            issuer = %proof.issuer,
            level = %proof.verification_level,
            valid_until = %valid_until,
            "identity proof issued"
        );
        Ok(proof)
    }
}

impl SignedProof for IdentityProof {
    fn identity_id(&self) -> &IdentityId {
        &self.identity_id
    }

    fn issuer(&self) -> &AccountId {
        &self.issuer
    }

    fn signature(&self) -> &Ed25519Signature {
        &self.signature
    }

    fn is_expired(&self, now: Timestamp) -> bool {
        past(self.valid_until, now)
    }

    /// Still VERIFIED, at the same level, for the same owner, and issued by
    /// the identity's own provider.
    fn check_state(
        &self,
        current: Option<&DigitalIdentity>,
        _now: Timestamp,
    ) -> Result<(), ProofFailure> {
        match current {
            Some(identity)
                if identity.status == IdentityStatus::Verified
                    && identity.verification_level == self.verification_level
                    && identity.owner == self.owner
                    && identity.identity_provider == self.issuer =>
            {
                Ok(())
            }
            _ => Err(ProofFailure::StateMismatch),
        }
    }
}
