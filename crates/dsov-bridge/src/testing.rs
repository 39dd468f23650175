//! Shared fixtures for the bridge's unit tests.

use std::sync::Arc;
use std::time::Duration;

use dsov_core::{AccountId, DataType, IdentityId, IdentityType, PermissionType, Timestamp, VerificationLevel};
use dsov_crypto::{Ed25519KeyPair, LocalSigner, SignerSet, TrustedKeys};
use dsov_ledger_client::{
    IdentityLedger, InMemoryIdentityLedger, InMemoryMarketplace, LedgerAccessGate, ManualClock,
};
use dsov_state::{PersonalInfo, Signatories, TransitionRequest};

use crate::bridge::Bridge;
use crate::config::BridgeConfig;

pub(crate) const PROVIDER: &str = "provider-1";
pub(crate) const OWNER: &str = "owner-1";

pub(crate) fn acct(s: &str) -> AccountId {
    AccountId::new(s).unwrap()
}

pub(crate) fn id(s: &str) -> IdentityId {
    IdentityId::new(s).unwrap()
}

pub(crate) fn test_config() -> BridgeConfig {
    BridgeConfig {
        sync_interval: Duration::from_secs(30),
        max_retry_attempts: 3,
        retry_base_delay: Duration::from_millis(10),
        proof_validation_timeout: Duration::from_secs(1),
        proof_ttl: Duration::from_secs(3600),
    }
}

pub(crate) struct Harness {
    pub ledger: Arc<InMemoryIdentityLedger>,
    pub market: Arc<InMemoryMarketplace>,
    pub clock: Arc<ManualClock>,
    pub bridge: Arc<Bridge>,
}

pub(crate) fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(Timestamp::parse("2026-03-01T00:00:00Z").unwrap()));
    let ledger = Arc::new(InMemoryIdentityLedger::with_clock(clock.clone()));
    let signer = Arc::new(LocalSigner::new(acct(PROVIDER), Ed25519KeyPair::from_seed(&[42; 32])));
    let signers = SignerSet::new().with(signer);
    let keys = Arc::new(TrustedKeys::from_signers(&signers));
    let config = test_config();
    let gate = Arc::new(LedgerAccessGate::new(
        ledger.clone(),
        keys.clone(),
        config.retry_policy(),
        clock.clone(),
    ));
    let market = Arc::new(InMemoryMarketplace::with_clock(gate, clock.clone()));
    let bridge = Bridge::new(config, ledger.clone(), market.clone(), signers, keys)
        .unwrap()
        .with_clock(clock.clone());
    Harness {
        ledger,
        market,
        clock,
        bridge: Arc::new(bridge),
    }
}

fn both() -> Signatories {
    Signatories::new().with(acct(OWNER)).with(acct(PROVIDER))
}

impl Harness {
    pub async fn register(&self, identity: &str) {
        self.ledger
            .submit_transition(
                &id(identity),
                TransitionRequest::Register {
                    owner: acct(OWNER),
                    identity_provider: acct(PROVIDER),
                    identity_type: IdentityType::NationalId,
                    personal_info: PersonalInfo::new().with("name", "A. Person"),
                    metadata: Default::default(),
                },
                &both(),
            )
            .await
            .unwrap();
    }

    pub async fn register_verified(&self, identity: &str, level: VerificationLevel) {
        self.register(identity).await;
        self.ledger
            .submit_transition(
                &id(identity),
                TransitionRequest::Verify {
                    verification_level: level,
                    verification_method: "document".into(),
                },
                &both(),
            )
            .await
            .unwrap();
    }

    pub async fn grant(&self, identity: &str, consumer: &str, data_type: DataType) {
        self.ledger
            .submit_transition(
                &id(identity),
                TransitionRequest::GrantAccess {
                    consumer: acct(consumer),
                    permission_type: PermissionType::ReadOnly,
                    data_types: vec![data_type],
                    expires_at: None,
                },
                &both(),
            )
            .await
            .unwrap();
    }

    pub async fn revoke_access(&self, identity: &str, consumer: &str, data_type: DataType) {
        self.ledger
            .submit_transition(
                &id(identity),
                TransitionRequest::RevokeAccess {
                    consumer: acct(consumer),
                    data_type,
                },
                &both(),
            )
            .await
            .unwrap();
    }

    pub async fn revoke_identity(&self, identity: &str) {
        self.ledger
            .submit_transition(
                &id(identity),
                TransitionRequest::Revoke {
                    reason: "fraud".into(),
                },
                &both(),
            )
            .await
            .unwrap();
    }
}
