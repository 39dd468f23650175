//! # Identity Ledger (Ledger A) Adapter
//!
//! `IdentityLedger` is the capability the bridge consumes. Implementations
//! must be `Send + Sync` and object safe; the adapter (live or in-memory) is
//! chosen at construction time by the `Arc<dyn IdentityLedger>` handed to
//! the bridge.
//!
//! `InMemoryIdentityLedger` runs the identity contract locally, so it
//! rejects exactly what the on-chain program would. It also supports fault
//! injection for exercising retry and partial-failure paths.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;

use dsov_core::{sha256_digest, CanonicalBytes, IdentityId, Timestamp, TxRef};
use dsov_state::{apply, DigitalIdentity, OracleRegistry, Signatories, TransitionKind, TransitionRequest};

use crate::clock::{Clock, SystemClock};
use crate::error::LedgerError;
use crate::event::LedgerEvent;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Read and write access to the identity ledger.
#[async_trait]
pub trait IdentityLedger: Send + Sync {
    /// Current record, or `None` if never registered.
    async fn get_identity(&self, id: &IdentityId) -> Result<Option<DigitalIdentity>, LedgerError>;

    /// Reference of the last transaction accepted for `id`.
    async fn last_tx_ref(&self, id: &IdentityId) -> Result<Option<TxRef>, LedgerError>;

    /// The record together with the reference of the transaction that
    /// produced it, read from one snapshot.
    async fn get_identity_with_tx(
        &self,
        id: &IdentityId,
    ) -> Result<Option<(DigitalIdentity, TxRef)>, LedgerError>;

    /// Submit a transition signed by `signers`. Returns its transaction
    /// reference, or `LedgerError::Contract` naming the violated clause.
    async fn submit_transition(
        &self,
        id: &IdentityId,
        request: TransitionRequest,
        signers: &Signatories,
    ) -> Result<TxRef, LedgerError>;

    /// Identities whose last change is at or after `since` (all when
    /// `None`), in identifier order.
    async fn changed_since(&self, since: Option<Timestamp>) -> Result<Vec<IdentityId>, LedgerError>;

    /// Stream of events for accepted transitions.
    fn subscribe_events(&self) -> broadcast::Receiver<LedgerEvent>;

    fn adapter_name(&self) -> &str;
}

/// Failure to inject into the in-memory ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFault {
    Timeout,
    RateLimited,
    Unavailable,
    /// Terminal; never retried.
    Rejected,
}

impl InjectedFault {
    fn to_error(self, operation: &'static str) -> LedgerError {
        match self {
            Self::Timeout => LedgerError::Timeout {
                operation,
                after_ms: 0,
            },
            Self::RateLimited => LedgerError::RateLimited { operation },
            Self::Unavailable => LedgerError::Unavailable {
                operation,
                reason: "injected fault".into(),
            },
            Self::Rejected => LedgerError::Rejected {
                reason: format!("injected fault in {operation}"),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct StoredIdentity {
    record: DigitalIdentity,
    last_tx: TxRef,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TxBody<'a> {
    identity_id: &'a IdentityId,
    request: &'a TransitionRequest,
    signers: &'a Signatories,
    sequence: u64,
    submitted_at: Timestamp,
}

/// In-process identity ledger enforcing the identity contract.
pub struct InMemoryIdentityLedger {
    identities: DashMap<IdentityId, StoredIdentity>,
    oracles: Option<Mutex<OracleRegistry>>,
    events: broadcast::Sender<LedgerEvent>,
    sequence: AtomicU64,
    clock: Arc<dyn Clock>,
    unreachable: AtomicBool,
    latency: RwLock<Duration>,
    read_faults: DashMap<IdentityId, (InjectedFault, u32)>,
}

impl Default for InMemoryIdentityLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityLedger {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            identities: DashMap::new(),
            oracles: None,
            events,
            sequence: AtomicU64::new(0),
            clock,
            unreachable: AtomicBool::new(false),
            latency: RwLock::new(Duration::ZERO),
            read_faults: DashMap::new(),
        }
    }

    /// Require Verify to come from an active registered oracle.
    pub fn with_oracles(mut self, registry: OracleRegistry) -> Self {
        self.oracles = Some(Mutex::new(registry));
        self
    }

    /// Snapshot of the oracle registry, if one is configured.
    pub fn oracles(&self) -> Option<OracleRegistry> {
        self.oracles.as_ref().map(|r| r.lock().clone())
    }

    /// Apply `f` to the oracle registry, if one is configured.
    pub fn update_oracles<R>(&self, f: impl FnOnce(&mut OracleRegistry) -> R) -> Option<R> {
        self.oracles.as_ref().map(|r| f(&mut r.lock()))
    }

    /// Make every call fail with `Unavailable` until cleared.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Fail the next `times` reads of `id` with `fault`.
    pub fn inject_read_fault(&self, id: &IdentityId, fault: InjectedFault, times: u32) {
        self.read_faults.insert(id.clone(), (fault, times));
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    async fn enter(&self, operation: &'static str) -> Result<(), LedgerError> {
        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(InjectedFault::Unavailable.to_error(operation));
        }
        Ok(())
    }

    fn take_read_fault(&self, id: &IdentityId) -> Option<InjectedFault> {
        let mut slot = self.read_faults.get_mut(id)?;
        let (fault, remaining) = *slot;
        if remaining == 0 {
            return None;
        }
        slot.1 = remaining - 1;
        Some(fault)
    }

    fn tx_ref(
        &self,
        id: &IdentityId,
        request: &TransitionRequest,
        signers: &Signatories,
        now: Timestamp,
    ) -> Result<TxRef, LedgerError> {
        let body = TxBody {
            identity_id: id,
            request,
            signers,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            submitted_at: now,
        };
        let canonical = CanonicalBytes::new(&body).map_err(|e| LedgerError::Rejected {
            reason: format!("transaction body is not canonicalizable: {e}"),
        })?;
        TxRef::new(sha256_digest(&canonical).to_string()).map_err(|e| LedgerError::Rejected {
            reason: e.to_string(),
        })
    }

    fn check_oracle(&self, kind: TransitionKind, current: Option<&DigitalIdentity>) -> Result<(), LedgerError> {
        if kind != TransitionKind::Verify {
            return Ok(());
        }
        match (&self.oracles, current) {
            (Some(registry), Some(identity)) => {
                registry.lock().require_active(&identity.identity_provider)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn record_oracle_verification(&self, identity: &DigitalIdentity) {
        if let Some(registry) = &self.oracles {
            if let Err(e) = registry.lock().record_verification(&identity.identity_provider) {
                tracing::warn!(provider = %identity.identity_provider, "oracle bookkeeping failed: {e}");
            }
        }
    }
}

#[async_trait]
impl IdentityLedger for InMemoryIdentityLedger {
    async fn get_identity(&self, id: &IdentityId) -> Result<Option<DigitalIdentity>, LedgerError> {
        self.enter("get_identity").await?;
        if let Some(fault) = self.take_read_fault(id) {
            return Err(fault.to_error("get_identity"));
        }
        Ok(self.identities.get(id).map(|s| s.record.clone()))
    }

    async fn last_tx_ref(&self, id: &IdentityId) -> Result<Option<TxRef>, LedgerError> {
        self.enter("last_tx_ref").await?;
        Ok(self.identities.get(id).map(|s| s.last_tx.clone()))
    }

    async fn get_identity_with_tx(
        &self,
        id: &IdentityId,
    ) -> Result<Option<(DigitalIdentity, TxRef)>, LedgerError> {
        self.enter("get_identity_with_tx").await?;
        if let Some(fault) = self.take_read_fault(id) {
            return Err(fault.to_error("get_identity_with_tx"));
        }
        Ok(self
            .identities
            .get(id)
            .map(|s| (s.record.clone(), s.last_tx.clone())))
    }

    async fn submit_transition(
        &self,
        id: &IdentityId,
        request: TransitionRequest,
        signers: &Signatories,
    ) -> Result<TxRef, LedgerError> {
        self.enter("submit_transition").await?;
        let now = self.clock.now();
        let kind = request.kind();

        // The entry guard serializes transitions on one identity.
        let (tx_ref, record) = match self.identities.entry(id.clone()) {
            Entry::Occupied(mut slot) => {
                let current = &slot.get().record;
                let next = apply(id, &request, Some(current), signers, now)?;
                self.check_oracle(kind, Some(current))?;
                let tx_ref = self.tx_ref(id, &request, signers, now)?;
                slot.insert(StoredIdentity {
                    record: next.clone(),
                    last_tx: tx_ref.clone(),
                });
                (tx_ref, next)
            }
            Entry::Vacant(slot) => {
                let next = apply(id, &request, None, signers, now)?;
                let tx_ref = self.tx_ref(id, &request, signers, now)?;
                slot.insert(StoredIdentity {
                    record: next.clone(),
                    last_tx: tx_ref.clone(),
                });
                (tx_ref, next)
            }
        };

        if kind == TransitionKind::Verify {
            self.record_oracle_verification(&record);
        }
        tracing::info!(identity_id = %id, transition = %kind, tx_ref = %tx_ref, "transition accepted");
        // No subscribers is not an error.
        let _ = self.events.send(LedgerEvent {
            event_type: kind.into(),
            identity_id: id.clone(),
            tx_ref: tx_ref.clone(),
            occurred_at: now,
        });
        Ok(tx_ref)
    }

    async fn changed_since(&self, since: Option<Timestamp>) -> Result<Vec<IdentityId>, LedgerError> {
        self.enter("changed_since").await?;
        let mut changed: Vec<IdentityId> = self
            .identities
            .iter()
            .filter(|s| since.map_or(true, |t| s.record.last_changed_at() >= t))
            .map(|s| s.key().clone())
            .collect();
        changed.sort();
        Ok(changed)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    fn adapter_name(&self) -> &str {
        "InMemoryIdentityLedger"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::LedgerEventType;
    use dsov_core::{AccountId, DataType, IdentityStatus, IdentityType, PermissionType, VerificationLevel};
    use dsov_state::{ContractClause, PersonalInfo};

    fn acct(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn id(s: &str) -> IdentityId {
        IdentityId::new(s).unwrap()
    }

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn signers() -> Signatories {
        Signatories::new().with(acct("owner")).with(acct("provider"))
    }

    fn register() -> TransitionRequest {
        TransitionRequest::Register {
            owner: acct("owner"),
            identity_provider: acct("provider"),
            identity_type: IdentityType::Email,
            personal_info: PersonalInfo::new().with("email", "a@example.com"),
            metadata: Default::default(),
        }
    }

    fn verify() -> TransitionRequest {
        TransitionRequest::Verify {
            verification_level: VerificationLevel::High,
            verification_method: "kyc".into(),
        }
    }

    fn ledger_at(start: &str) -> (InMemoryIdentityLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(ts(start)));
        (InMemoryIdentityLedger::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn register_verify_grant_flow() {
        let (ledger, _) = ledger_at("2026-01-01T00:00:00Z");
        let mut events = ledger.subscribe_events();

        let tx1 = ledger.submit_transition(&id("ID_001"), register(), &signers()).await.unwrap();
        let tx2 = ledger.submit_transition(&id("ID_001"), verify(), &signers()).await.unwrap();
        assert_ne!(tx1, tx2);
        assert!(tx2.as_str().starts_with("sha256:"));

        ledger
            .submit_transition(
                &id("ID_001"),
                TransitionRequest::GrantAccess {
                    consumer: acct("C1"),
                    permission_type: PermissionType::ReadOnly,
                    data_types: vec![DataType::LocationHistory],
                    expires_at: None,
                },
                &signers(),
            )
            .await
            .unwrap();

        let record = ledger.get_identity(&id("ID_001")).await.unwrap().unwrap();
        assert_eq!(record.status, IdentityStatus::Verified);
        assert_eq!(record.access_permissions.len(), 1);

        let kinds: Vec<LedgerEventType> = (0..3).map(|_| events.try_recv().unwrap().event_type).collect();
        assert_eq!(
            kinds,
            vec![
                LedgerEventType::IdentityRegistered,
                LedgerEventType::IdentityVerified,
                LedgerEventType::AccessGranted
            ]
        );
    }

    #[tokio::test]
    async fn contract_rejection_surfaces_clause_and_leaves_state() {
        let (ledger, _) = ledger_at("2026-01-01T00:00:00Z");
        ledger.submit_transition(&id("ID_001"), register(), &signers()).await.unwrap();
        let before = ledger.get_identity(&id("ID_001")).await.unwrap();

        let err = ledger
            .submit_transition(
                &id("ID_001"),
                TransitionRequest::Revoke { reason: String::new() },
                &Signatories::new(),
            )
            .await
            .unwrap_err();
        match err {
            LedgerError::Contract(v) => assert_eq!(v.clause, ContractClause::MissingSigner),
            other => panic!("expected contract violation, got {other:?}"),
        }
        assert_eq!(ledger.get_identity(&id("ID_001")).await.unwrap(), before);
    }

    #[tokio::test]
    async fn duplicate_register_is_rejected() {
        let (ledger, _) = ledger_at("2026-01-01T00:00:00Z");
        ledger.submit_transition(&id("ID_001"), register(), &signers()).await.unwrap();
        let err = ledger.submit_transition(&id("ID_001"), register(), &signers()).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Contract(ref v) if v.clause == ContractClause::IdentityAlreadyExists
        ));
    }

    #[tokio::test]
    async fn record_and_tx_ref_are_read_together() {
        let (ledger, _) = ledger_at("2026-01-01T00:00:00Z");
        assert!(ledger.get_identity_with_tx(&id("ID_001")).await.unwrap().is_none());

        ledger.submit_transition(&id("ID_001"), register(), &signers()).await.unwrap();
        let tx = ledger.submit_transition(&id("ID_001"), verify(), &signers()).await.unwrap();
        let (record, last_tx) = ledger.get_identity_with_tx(&id("ID_001")).await.unwrap().unwrap();
        assert_eq!(record.status, IdentityStatus::Verified);
        assert_eq!(last_tx, tx);

        ledger.inject_read_fault(&id("ID_001"), InjectedFault::Timeout, 1);
        let err = ledger.get_identity_with_tx(&id("ID_001")).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn changed_since_filters_and_orders() {
        let (ledger, clock) = ledger_at("2026-01-01T00:00:00Z");
        ledger.submit_transition(&id("ID_B"), register(), &signers()).await.unwrap();
        ledger.submit_transition(&id("ID_A"), register(), &signers()).await.unwrap();
        clock.advance(Duration::from_secs(60));
        ledger.submit_transition(&id("ID_C"), register(), &signers()).await.unwrap();

        let all = ledger.changed_since(None).await.unwrap();
        assert_eq!(all, vec![id("ID_A"), id("ID_B"), id("ID_C")]);

        let recent = ledger.changed_since(Some(ts("2026-01-01T00:01:00Z"))).await.unwrap();
        assert_eq!(recent, vec![id("ID_C")]);
    }

    #[tokio::test]
    async fn verify_requires_active_oracle_when_configured() {
        let (ledger, _) = ledger_at("2026-01-01T00:00:00Z");
        let mut registry = OracleRegistry::new(1_000, 600);
        registry
            .register_oracle(acct("provider"), "Acme KYC", 1_000, ts("2026-01-01T00:00:00Z"))
            .unwrap();
        let ledger = ledger.with_oracles(registry);

        ledger.submit_transition(&id("ID_001"), register(), &signers()).await.unwrap();
        ledger.update_oracles(|r| r.slash(&acct("provider"))).unwrap().unwrap();

        let err = ledger.submit_transition(&id("ID_001"), verify(), &signers()).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Contract(ref v) if v.clause == ContractClause::OracleNotActive
        ));
    }

    #[tokio::test]
    async fn successful_verify_is_recorded_on_oracle() {
        let (ledger, _) = ledger_at("2026-01-01T00:00:00Z");
        let mut registry = OracleRegistry::new(1_000, 100);
        registry
            .register_oracle(acct("provider"), "Acme KYC", 5_000, ts("2026-01-01T00:00:00Z"))
            .unwrap();
        let ledger = ledger.with_oracles(registry);

        ledger.submit_transition(&id("ID_001"), register(), &signers()).await.unwrap();
        ledger.submit_transition(&id("ID_001"), verify(), &signers()).await.unwrap();

        let oracle = ledger.oracles().unwrap().get(&acct("provider")).cloned().unwrap();
        assert_eq!(oracle.verification_count, 1);
        assert_eq!(oracle.successful_verifications, 1);
    }

    #[tokio::test]
    async fn read_faults_are_consumed() {
        let (ledger, _) = ledger_at("2026-01-01T00:00:00Z");
        ledger.submit_transition(&id("ID_001"), register(), &signers()).await.unwrap();
        ledger.inject_read_fault(&id("ID_001"), InjectedFault::Timeout, 2);

        assert!(ledger.get_identity(&id("ID_001")).await.unwrap_err().is_transient());
        assert!(ledger.get_identity(&id("ID_001")).await.is_err());
        assert!(ledger.get_identity(&id("ID_001")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unreachable_fails_every_call() {
        let (ledger, _) = ledger_at("2026-01-01T00:00:00Z");
        ledger.set_unreachable(true);
        assert!(matches!(
            ledger.changed_since(None).await,
            Err(LedgerError::Unavailable { .. })
        ));
        ledger.set_unreachable(false);
        assert!(ledger.changed_since(None).await.unwrap().is_empty());
    }
}
