//! # Proof Gate
//!
//! Full proof validation against live identity-ledger state: signature
//! first (short-circuits), then expiry, then a fresh read of the identity.
//! A read that still fails after retries yields `LEDGER_UNAVAILABLE`, so
//! the gate fails closed.

use std::sync::Arc;

use async_trait::async_trait;

use dsov_crypto::TrustedKeys;
use dsov_proof::{AccessProof, IdentityProof, LedgerView, SignedProof, ValidationResult};

use crate::clock::Clock;
use crate::identity::IdentityLedger;
use crate::retry::{with_retry, RetryPolicy};

/// Decides whether an access proof unblocks a marketplace action.
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn validate_access_proof(&self, proof: &AccessProof) -> ValidationResult;
}

/// Validate any signed proof against the current state of `ledger`.
pub async fn validate_with_ledger<P>(
    proof: &P,
    ledger: &dyn IdentityLedger,
    keys: &TrustedKeys,
    policy: &RetryPolicy,
    clock: &dyn Clock,
) -> ValidationResult
where
    P: SignedProof + Sync,
{
    if let Err(failure) = proof.check_signature(keys) {
        return ValidationResult::rejected(failure, clock.now());
    }
    let id = proof.identity_id();
    let read = with_retry(policy, "get_identity", || ledger.get_identity(id)).await;
    let now = clock.now();
    let failures = match &read {
        Ok(Some(identity)) => proof.freshness_failures(LedgerView::Found(identity), now),
        Ok(None) => proof.freshness_failures(LedgerView::Missing, now),
        Err(e) => {
            tracing::warn!(identity_id = %id, "identity read failed during proof validation: {e}");
            proof.freshness_failures(LedgerView::Unavailable, now)
        }
    };
    ValidationResult::from_failures(failures, now)
}

/// Gate backed directly by an identity ledger and a trusted key ring.
pub struct LedgerAccessGate {
    ledger: Arc<dyn IdentityLedger>,
    keys: Arc<TrustedKeys>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl LedgerAccessGate {
    pub fn new(
        ledger: Arc<dyn IdentityLedger>,
        keys: Arc<TrustedKeys>,
        policy: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            keys,
            policy,
            clock,
        }
    }

    pub async fn validate_identity_proof(&self, proof: &IdentityProof) -> ValidationResult {
        validate_with_ledger(
            proof,
            self.ledger.as_ref(),
            &self.keys,
            &self.policy,
            self.clock.as_ref(),
        )
        .await
    }
}

#[async_trait]
impl AccessGate for LedgerAccessGate {
    async fn validate_access_proof(&self, proof: &AccessProof) -> ValidationResult {
        validate_with_ledger(
            proof,
            self.ledger.as_ref(),
            &self.keys,
            &self.policy,
            self.clock.as_ref(),
        )
        .await
    }
}
