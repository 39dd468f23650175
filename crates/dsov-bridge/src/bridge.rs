//! # Bridge: Proof Orchestration
//!
//! Reads identity state from Ledger A, signs proofs with the provider's
//! signing capability, and validates presented proofs against fresh ledger
//! state. Proof calls only read ledger state; they run concurrently with
//! each other and with the synchronizer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use dsov_core::{AccountId, DataType, IdentityId, Timestamp, TxRef};
use dsov_crypto::{ProofSigner, SignerSet, TrustedKeys};
use dsov_ledger_client::{
    validate_with_ledger, with_retry, AccessGate, Clock, DataListing, IdentityLedger, Marketplace,
    RetryPolicy, SystemClock,
};
use dsov_proof::{AccessProof, IdentityProof, ValidationResult};
use dsov_state::DigitalIdentity;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::sync::SyncControl;

/// Identity state as the bridge currently sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub identity: DigitalIdentity,
    pub last_tx_ref: TxRef,
    pub listings: Vec<DataListing>,
    pub captured_at: Timestamp,
}

/// Cross-ledger bridge.
pub struct Bridge {
    pub(crate) config: BridgeConfig,
    pub(crate) policy: RetryPolicy,
    pub(crate) ledger: Arc<dyn IdentityLedger>,
    pub(crate) marketplace: Arc<dyn Marketplace>,
    signers: SignerSet,
    keys: Arc<TrustedKeys>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) sync: SyncControl,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("ledger", &self.ledger.adapter_name())
            .field("marketplace", &self.marketplace.adapter_name())
            .field("signers", &self.signers)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Build a bridge over the given adapters. The configuration is
    /// validated here.
    pub fn new(
        config: BridgeConfig,
        ledger: Arc<dyn IdentityLedger>,
        marketplace: Arc<dyn Marketplace>,
        signers: SignerSet,
        keys: Arc<TrustedKeys>,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        Ok(Self {
            policy: config.retry_policy(),
            config,
            ledger,
            marketplace,
            signers,
            keys,
            clock: Arc::new(SystemClock),
            sync: SyncControl::default(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn trusted_keys(&self) -> &Arc<TrustedKeys> {
        &self.keys
    }

    async fn fetch_identity_with_tx(
        &self,
        id: &IdentityId,
    ) -> Result<(DigitalIdentity, TxRef), BridgeError> {
        let ledger = self.ledger.as_ref();
        with_retry(&self.policy, "get_identity_with_tx", || ledger.get_identity_with_tx(id))
            .await?
            .ok_or_else(|| BridgeError::IdentityNotFound {
                identity_id: id.clone(),
            })
    }

    fn signer_for(&self, provider: &AccountId) -> Result<&Arc<dyn ProofSigner>, BridgeError> {
        self.signers
            .get(provider)
            .ok_or_else(|| BridgeError::SignerUnavailable {
                provider: provider.clone(),
            })
    }

    /// Attest that `identity_id` is currently VERIFIED.
    pub async fn generate_identity_proof(
        &self,
        identity_id: &IdentityId,
    ) -> Result<IdentityProof, BridgeError> {
        let (identity, tx_ref) = self.fetch_identity_with_tx(identity_id).await?;
        if !identity.is_verified() {
            return Err(BridgeError::InvalidState {
                identity_id: identity.identity_id,
                status: identity.status,
            });
        }
        let signer = self.signer_for(&identity.identity_provider)?;
        let proof = IdentityProof::issue(
            &identity,
            tx_ref,
            signer.as_ref(),
            self.clock.now(),
            self.config.proof_ttl,
        )?;
        Ok(proof)
    }

    /// Signature, expiry, then a fresh ledger read: still VERIFIED at the
    /// attested level.
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

    /// Attest that `consumer` currently holds access to `data_type`.
    pub async fn generate_access_proof(
        &self,
        identity_id: &IdentityId,
        consumer: &AccountId,
        data_type: DataType,
    ) -> Result<AccessProof, BridgeError> {
        let (identity, tx_ref) = self.fetch_identity_with_tx(identity_id).await?;
        let now = self.clock.now();
        if !identity.has_access(consumer, data_type, now) {
            return Err(BridgeError::AccessDenied {
                identity_id: identity.identity_id,
                consumer: consumer.clone(),
                data_type,
            });
        }
        let signer = self.signer_for(&identity.identity_provider)?;
        let proof = AccessProof::issue(
            &identity,
            consumer,
            data_type,
            tx_ref,
            signer.as_ref(),
            now,
            self.config.proof_ttl,
        )?;
        Ok(proof)
    }

    /// Signature, expiry, then `has_access` re-derived from current state.
    /// A permission revoked after issuance invalidates the proof.
    pub async fn validate_access_proof(&self, proof: &AccessProof) -> ValidationResult {
        validate_with_ledger(
            proof,
            self.ledger.as_ref(),
            &self.keys,
            &self.policy,
            self.clock.as_ref(),
        )
        .await
    }

    /// Current identity record with its marketplace listings.
    pub async fn get_state_snapshot(&self, identity_id: &IdentityId) -> Result<StateSnapshot, BridgeError> {
        let (identity, last_tx_ref) = self.fetch_identity_with_tx(identity_id).await?;
        let marketplace = self.marketplace.as_ref();
        let listings =
            with_retry(&self.policy, "listings_for", || marketplace.listings_for(identity_id)).await?;
        Ok(StateSnapshot {
            identity,
            last_tx_ref,
            listings,
            captured_at: self.clock.now(),
        })
    }
}

#[async_trait]
impl AccessGate for Bridge {
    async fn validate_access_proof(&self, proof: &AccessProof) -> ValidationResult {
        Bridge::validate_access_proof(self, proof).await
    }
}
