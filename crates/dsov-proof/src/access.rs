//! # Access Proof
//!
//! Snapshot of one active `AccessPermission`, signed by the identity's
//! provider. Validation re-derives `has_access` from current ledger state,
//! so revoking the permission invalidates outstanding proofs at once.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use dsov_core::{AccountId, DataType, IdentityId, PermissionType, Timestamp, TxRef};
use dsov_crypto::{Ed25519Signature, ProofSigner};
use dsov_state::DigitalIdentity;

use crate::error::ProofError;
use crate::result::ProofFailure;
use crate::signed::{past, SignedProof};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessProof {
    pub identity_id: IdentityId,
    pub consumer: AccountId,
    pub permission_type: PermissionType,
    pub data_types: BTreeSet<DataType>,
    /// The data type this proof was requested for.
    pub data_type: DataType,
    pub granted_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    pub is_active: bool,
    pub granted_by: AccountId,
    pub issuer: AccountId,
    pub issued_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Timestamp>,
    pub source_transaction_ref: TxRef,
    pub signature: Ed25519Signature,
}

impl AccessProof {
    /// Issue a proof that `consumer` may access `data_type` on `identity`.
    ///
    /// Fails with `AccessDenied` unless `has_access` holds at `now`.
    pub fn issue(
        identity: &DigitalIdentity,
        consumer: &AccountId,
        data_type: DataType,
        source_transaction_ref: TxRef,
        signer: &dyn ProofSigner,
        now: Timestamp,
        ttl: Duration,
    ) -> Result<Self, ProofError> {
        let permission = identity
            .granting_permission(consumer, data_type, now)
            .ok_or_else(|| ProofError::AccessDenied {
                identity_id: identity.identity_id.clone(),
                consumer: consumer.clone(),
                data_type,
            })?;
        if signer.signer_id() != &identity.identity_provider {
            return Err(ProofError::SignerMismatch {
                expected: identity.identity_provider.clone(),
                actual: signer.signer_id().clone(),
            });
        }
        let valid_until = now.checked_add(ttl).ok_or(ProofError::TtlOverflow)?;

        let mut proof = Self {
            identity_id: identity.identity_id.clone(),
            consumer: permission.consumer.clone(),
            permission_type: permission.permission_type,
            data_types: permission.data_types.clone(),
            data_type,
            granted_at: permission.granted_at,
            expires_at: permission.expires_at,
            is_active: permission.is_active,
            granted_by: permission.granted_by.clone(),
            issuer: identity.identity_provider.clone(),
            issued_at: now,
            valid_until: Some(valid_until),
            source_transaction_ref,
            signature: Ed25519Signature::from_bytes([0; 64]),
        };
        proof.signature = signer.sign(&proof.signing_input()?)?;

        info!(
            identity_id = %proof.identity_id,
            consumer = %proof.consumer,
            data_type = %data_type,
            "access proof issued"
        );
        Ok(proof)
    }
}

impl SignedProof for AccessProof {
    fn identity_id(&self) -> &IdentityId {
        &self.identity_id
    }

    fn issuer(&self) -> &AccountId {
        &self.issuer
    }

    fn signature(&self) -> &Ed25519Signature {
        &self.signature
    }

    /// Expired when either the proof's own bound or the permission's has passed.
    fn is_expired(&self, now: Timestamp) -> bool {
        past(self.valid_until, now) || past(self.expires_at, now)
    }

    /// Issued by the identity's own provider and still granted.
    fn check_state(
        &self,
        current: Option<&DigitalIdentity>,
        now: Timestamp,
    ) -> Result<(), ProofFailure> {
        match current {
            Some(identity)
                if identity.identity_provider == self.issuer
                    && identity.has_access(&self.consumer, self.data_type, now) =>
            {
                Ok(())
            }
            _ => Err(ProofFailure::AccessDenied),
        }
    }
}
