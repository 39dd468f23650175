//! Shared wiring for the integration scenarios: an in-memory identity
//! ledger, an access-gated marketplace, and a bridge over both, all on one
//! manual clock.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dsov_bridge::{Bridge, BridgeConfig};
use dsov_core::{
    AccountId, DataType, IdentityId, IdentityType, PermissionType, Timestamp, TxRef,
    VerificationLevel,
};
use dsov_crypto::{Ed25519KeyPair, LocalSigner, SignerSet, TrustedKeys};
use dsov_ledger_client::{
    IdentityLedger, InMemoryIdentityLedger, InMemoryMarketplace, LedgerAccessGate, LedgerError,
    ManualClock,
};
use dsov_state::{PersonalInfo, Signatories, TransitionRequest};

pub const PROVIDER: &str = "kyc-provider";
pub const OWNER: &str = "alice";

pub fn acct(s: &str) -> AccountId {
    AccountId::new(s).unwrap()
}

pub fn id(s: &str) -> IdentityId {
    IdentityId::new(s).unwrap()
}

pub fn config() -> BridgeConfig {
    BridgeConfig {
        retry_base_delay: Duration::from_millis(20),
        proof_validation_timeout: Duration::from_millis(500),
        ..BridgeConfig::default()
    }
}

pub fn signed_by_both() -> Signatories {
    Signatories::new().with(acct(OWNER)).with(acct(PROVIDER))
}

pub struct World {
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<InMemoryIdentityLedger>,
    pub market: Arc<InMemoryMarketplace>,
    pub bridge: Arc<Bridge>,
}

impl World {
    pub fn new() -> Self {
        Self::with_ledger(|clock| InMemoryIdentityLedger::with_clock(clock))
    }

    pub fn with_ledger(build: impl FnOnce(Arc<ManualClock>) -> InMemoryIdentityLedger) -> Self {
        let clock = Arc::new(ManualClock::new(Timestamp::parse("2026-06-01T12:00:00Z").unwrap()));
        let ledger = Arc::new(build(clock.clone()));
        let signer = LocalSigner::new(acct(PROVIDER), Ed25519KeyPair::from_seed(&[9; 32]));
        let signers = SignerSet::new().with(Arc::new(signer));
        let keys = Arc::new(TrustedKeys::from_signers(&signers));
        let config = config();
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
        Self {
            clock,
            ledger,
            market,
            bridge: Arc::new(bridge),
        }
    }

    pub async fn submit(&self, identity: &str, request: TransitionRequest) -> Result<TxRef, LedgerError> {
        self.ledger
            .submit_transition(&id(identity), request, &signed_by_both())
            .await
    }

    pub async fn register(&self, identity: &str) {
        self.submit(
            identity,
            TransitionRequest::Register {
                owner: acct(OWNER),
                identity_provider: acct(PROVIDER),
                identity_type: IdentityType::NationalId,
                personal_info: PersonalInfo::new().with("name", "Alice"),
                metadata: Default::default(),
            },
        )
        .await
        .unwrap();
    }

    pub async fn verify(&self, identity: &str, level: VerificationLevel) -> Result<TxRef, LedgerError> {
        self.submit(
            identity,
            TransitionRequest::Verify {
                verification_level: level,
                verification_method: "biometric".into(),
            },
        )
        .await
    }

    pub async fn register_verified(&self, identity: &str, level: VerificationLevel) {
        self.register(identity).await;
        self.verify(identity, level).await.unwrap();
    }

    pub async fn grant(&self, identity: &str, consumer: &str, data_type: DataType) {
        self.submit(
            identity,
            TransitionRequest::GrantAccess {
                consumer: acct(consumer),
                permission_type: PermissionType::ReadOnly,
                data_types: vec![data_type],
                expires_at: None,
            },
        )
        .await
        .unwrap();
    }

    pub async fn revoke_access(&self, identity: &str, consumer: &str, data_type: DataType) {
        self.submit(
            identity,
            TransitionRequest::RevokeAccess {
                consumer: acct(consumer),
                data_type,
            },
        )
        .await
        .unwrap();
    }
}
