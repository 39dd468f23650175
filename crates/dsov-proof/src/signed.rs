//! Behavior shared by identity and access proofs.

use serde::Serialize;
use tracing::debug;

use dsov_core::{AccountId, CanonicalBytes, IdentityId, Timestamp};
use dsov_crypto::{verify_with_public_key, Ed25519PublicKey, Ed25519Signature, TrustedKeys};
use dsov_state::DigitalIdentity;

use crate::error::ProofError;
use crate::result::{ProofFailure, ValidationResult};

/// Current ledger state for the identity a proof names.
#[derive(Debug, Clone, Copy)]
pub enum LedgerView<'a> {
    Found(&'a DigitalIdentity),
    Missing,
    /// The read failed after retries.
    Unavailable,
}

/// A signed attestation issued by an identity provider.
///
/// The signature covers the canonical JSON of every field except
/// `signature` itself.
pub trait SignedProof: Serialize {
    fn identity_id(&self) -> &IdentityId;

    /// Provider account whose key signed this proof.
    fn issuer(&self) -> &AccountId;

    fn signature(&self) -> &Ed25519Signature;

    /// True once any expiry bound carried by the proof has passed.
    fn is_expired(&self, now: Timestamp) -> bool;

    /// Re-check the attested fact against current ledger state.
    /// `None` means the identity no longer exists.
    fn check_state(&self, current: Option<&DigitalIdentity>, now: Timestamp)
        -> Result<(), ProofFailure>;

    /// Canonical bytes the signature is computed over.
    fn signing_input(&self) -> Result<CanonicalBytes, ProofError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("signature");
        }
        Ok(CanonicalBytes::new(&value)?)
    }

    /// Verify the signature against the issuer's key in `keys`.
    /// An untrusted issuer fails the same way as a forged signature.
    fn check_signature(&self, keys: &TrustedKeys) -> Result<(), ProofFailure> {
        let key = keys.get(self.issuer()).ok_or_else(|| {
            debug!(issuer = %self.issuer(), "proof issuer not in trusted key ring");
            ProofFailure::BadSignature
        })?;
        self.check_signature_with(&key)
    }

    /// Verify the signature against an explicit public key.
    fn check_signature_with(&self, key: &Ed25519PublicKey) -> Result<(), ProofFailure> {
        let input = self.signing_input().map_err(|e| {
            debug!(error = %e, "proof body could not be canonicalized");
            ProofFailure::BadSignature
        })?;
        verify_with_public_key(&input, self.signature(), key).map_err(|_| {
            debug!(identity_id = %self.identity_id(), "proof signature rejected");
            ProofFailure::BadSignature
        })
    }

    /// Signature and expiry checks only; no ledger re-check.
    fn verify_offline(&self, key: &Ed25519PublicKey, now: Timestamp) -> ValidationResult {
        if let Err(failure) = self.check_signature_with(key) {
            return ValidationResult::rejected(failure, now);
        }
        let mut failures = Vec::new();
        if self.is_expired(now) {
            debug!(identity_id = %self.identity_id(), "proof expired");
            failures.push(ProofFailure::Expired);
        }
        ValidationResult::from_failures(failures, now)
    }

    /// Full validation given the identity as currently read from the ledger.
    fn validate_against(
        &self,
        keys: &TrustedKeys,
        current: LedgerView<'_>,
        now: Timestamp,
    ) -> ValidationResult {
        if let Err(failure) = self.check_signature(keys) {
            return ValidationResult::rejected(failure, now);
        }
        ValidationResult::from_failures(self.freshness_failures(current, now), now)
    }

    /// Expiry then ledger-state failures, in that order. Assumes the
    /// signature has already been checked.
    fn freshness_failures(&self, current: LedgerView<'_>, now: Timestamp) -> Vec<ProofFailure> {
        let mut failures = Vec::new();
        if self.is_expired(now) {
            debug!(identity_id = %self.identity_id(), "proof expired");
            failures.push(ProofFailure::Expired);
        }
        let state = match current {
            LedgerView::Found(identity) => self.check_state(Some(identity), now),
            LedgerView::Missing => self.check_state(None, now),
            LedgerView::Unavailable => Err(ProofFailure::LedgerUnavailable),
        };
        if let Err(failure) = state {
            debug!(identity_id = %self.identity_id(), %failure, "proof no longer matches ledger");
            failures.push(failure);
        }
        failures
    }
}

/// `now >= bound`, with an absent bound never expiring.
pub(crate) fn past(bound: Option<Timestamp>, now: Timestamp) -> bool {
    bound.is_some_and(|b| now >= b)
}
