//! # Sync Subcommand
//!
//! Seeds an in-memory identity ledger from a JSON fixture, wires a bridge
//! over it with the configuration from `DSOV_*` environment variables, and
//! runs the synchronizer. Each finished cycle is printed as JSON.
//!
//! Fixture shape:
//!
//! ```json
//! { "identities": [ {
//!     "identityId": "ID_001", "owner": "alice", "identityProvider": "kyc-1",
//!     "identityType": "PASSPORT",
//!     "verify": { "level": "HIGH", "method": "document" },
//!     "grants": [ { "consumer": "acme", "permissionType": "READ_ONLY",
//!                   "dataTypes": ["APP_USAGE"] } ],
//!     "revoked": null
//! } ] }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use tokio::sync::watch;

use dsov_bridge::{Bridge, BridgeConfig, CycleOutcome, SyncResult};
use dsov_core::{
    AccountId, DataType, IdentityId, IdentityType, PermissionType, Timestamp, VerificationLevel,
};
use dsov_crypto::{LocalSigner, SignerSet, TrustedKeys};
use dsov_ledger_client::{
    IdentityLedger, InMemoryIdentityLedger, InMemoryMarketplace, LedgerAccessGate, SystemClock,
};
use dsov_state::{PersonalInfo, Signatories, TransitionRequest};

/// Arguments for `dsov sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// JSON fixture of identities to seed the in-memory ledger with.
    #[arg(long)]
    pub fixture: PathBuf,
    /// Run a single cycle and exit instead of looping until Ctrl-C.
    #[arg(long)]
    pub once: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Fixture {
    pub identities: Vec<FixtureIdentity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FixtureIdentity {
    pub identity_id: IdentityId,
    pub owner: AccountId,
    pub identity_provider: AccountId,
    pub identity_type: IdentityType,
    #[serde(default)]
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub verify: Option<FixtureVerify>,
    #[serde(default)]
    pub grants: Vec<FixtureGrant>,
    /// Revocation reason; the identity is revoked last when present.
    #[serde(default)]
    pub revoked: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FixtureVerify {
    pub level: VerificationLevel,
    pub method: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FixtureGrant {
    pub consumer: AccountId,
    pub permission_type: PermissionType,
    pub data_types: Vec<DataType>,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

pub fn run_sync(args: &SyncArgs) -> Result<u8> {
    let config = BridgeConfig::from_env().context("invalid bridge configuration")?;
    let fixture = load_fixture(&args.fixture)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(async {
        let bridge = Arc::new(build_bridge(config, &fixture).await?);
        if args.once {
            run_once(&bridge).await
        } else {
            run_until_interrupted(bridge).await
        }
    })
}

pub(crate) fn load_fixture(path: &Path) -> Result<Fixture> {
    let content = crate::read_file(path, "fixture")?;
    serde_json::from_str(&content).with_context(|| format!("invalid fixture: {}", path.display()))
}

/// Seed the ledger and wire a bridge with one generated signer per
/// provider named in the fixture.
pub(crate) async fn build_bridge(config: BridgeConfig, fixture: &Fixture) -> Result<Bridge> {
    let ledger = Arc::new(InMemoryIdentityLedger::new());
    let mut signers = SignerSet::new();
    for entry in &fixture.identities {
        if signers.get(&entry.identity_provider).is_none() {
            signers.insert(Arc::new(LocalSigner::generate(entry.identity_provider.clone())));
        }
        seed_identity(ledger.as_ref(), entry)
            .await
            .with_context(|| format!("failed to seed identity {}", entry.identity_id))?;
    }
    tracing::info!(identities = ledger.len(), providers = signers.len(), "fixture loaded");

    let keys = Arc::new(TrustedKeys::from_signers(&signers));
    let gate = Arc::new(LedgerAccessGate::new(
        ledger.clone(),
        keys.clone(),
        config.retry_policy(),
        Arc::new(SystemClock),
    ));
    let marketplace = Arc::new(InMemoryMarketplace::new(gate));
    Bridge::new(config, ledger, marketplace, signers, keys).context("failed to build bridge")
}

async fn seed_identity(ledger: &dyn IdentityLedger, entry: &FixtureIdentity) -> Result<()> {
    let both = Signatories::new()
        .with(entry.owner.clone())
        .with(entry.identity_provider.clone());
    let id = &entry.identity_id;

    ledger
        .submit_transition(
            id,
            TransitionRequest::Register {
                owner: entry.owner.clone(),
                identity_provider: entry.identity_provider.clone(),
                identity_type: entry.identity_type,
                personal_info: entry.personal_info.clone(),
                metadata: entry.metadata.clone(),
            },
            &both,
        )
        .await?;
    if let Some(verify) = &entry.verify {
        ledger
            .submit_transition(
                id,
                TransitionRequest::Verify {
                    verification_level: verify.level,
                    verification_method: verify.method.clone(),
                },
                &both,
            )
            .await?;
    }
    for grant in &entry.grants {
        ledger
            .submit_transition(
                id,
                TransitionRequest::GrantAccess {
                    consumer: grant.consumer.clone(),
                    permission_type: grant.permission_type,
                    data_types: grant.data_types.clone(),
                    expires_at: grant.expires_at,
                },
                &both,
            )
            .await?;
    }
    if let Some(reason) = &entry.revoked {
        ledger
            .submit_transition(id, TransitionRequest::Revoke { reason: reason.clone() }, &both)
            .await?;
    }
    Ok(())
}

fn print_result(result: &SyncResult) -> Result<()> {
    println!("{}", serde_json::to_string(result).context("failed to render sync result")?);
    Ok(())
}

async fn run_once(bridge: &Bridge) -> Result<u8> {
    match bridge.run_sync_cycle().await {
        CycleOutcome::Completed(result) => {
            print_result(&result)?;
            Ok(if result.failed_count == 0 && result.errors.is_empty() { 0 } else { 1 })
        }
        CycleOutcome::InFlight(_) => anyhow::bail!("a sync cycle is already running"),
    }
}

async fn run_until_interrupted(bridge: Arc<Bridge>) -> Result<u8> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = {
        let bridge = Arc::clone(&bridge);
        tokio::spawn(async move { bridge.run_periodic(shutdown_rx).await })
    };

    let mut printed = 0;
    let mut poll = tokio::time::interval(Duration::from_millis(200));
    loop {
        tokio::select! {
            _ = poll.tick() => {
                let status = bridge.get_sync_status();
                if status.cycles_completed > printed {
                    printed = status.cycles_completed;
                    if let Some(result) = &status.last_result {
                        print_result(result)?;
                    }
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                tracing::info!("interrupt received, stopping sync");
                break;
            }
        }
    }

    bridge.stop_sync();
    // Err only if the runner already exited.
    let _ = shutdown_tx.send(true);
    runner.await.context("sync task panicked")?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsov_core::IdentityStatus;

    const FIXTURE: &str = r#"{
        "identities": [
            {
                "identityId": "ID_001",
                "owner": "alice",
                "identityProvider": "kyc-1",
                "identityType": "PASSPORT",
                "personalInfo": { "name": "Alice" },
                "verify": { "level": "HIGH", "method": "document" },
                "grants": [
                    { "consumer": "acme", "permissionType": "READ_ONLY", "dataTypes": ["APP_USAGE"] }
                ]
            },
            {
                "identityId": "ID_002",
                "owner": "bob",
                "identityProvider": "kyc-2",
                "identityType": "EMAIL"
            },
            {
                "identityId": "ID_003",
                "owner": "carol",
                "identityProvider": "kyc-1",
                "identityType": "NATIONAL_ID",
                "verify": { "level": "BASIC", "method": "video" },
                "revoked": "fraud"
            }
        ]
    }"#;

    fn fixture() -> Fixture {
        serde_json::from_str(FIXTURE).unwrap()
    }

    #[test]
    fn fixture_parses_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, FIXTURE).unwrap();
        let loaded = load_fixture(&path).unwrap();
        assert_eq!(loaded.identities.len(), 3);
        assert_eq!(loaded.identities[0].grants[0].data_types, vec![DataType::AppUsage]);
    }

    #[test]
    fn malformed_fixture_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "identities": [ { "identityId": "" } ] }"#).unwrap();
        let err = load_fixture(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[tokio::test]
    async fn seeded_bridge_issues_proofs_and_syncs() {
        let bridge = build_bridge(BridgeConfig::default(), &fixture()).await.unwrap();

        let alice = IdentityId::new("ID_001").unwrap();
        let proof = bridge.generate_identity_proof(&alice).await.unwrap();
        assert!(bridge.validate_identity_proof(&proof).await.is_valid());

        let access = bridge
            .generate_access_proof(&alice, &AccountId::new("acme").unwrap(), DataType::AppUsage)
            .await
            .unwrap();
        assert!(bridge.validate_access_proof(&access).await.is_valid());

        let carol = bridge
            .get_state_snapshot(&IdentityId::new("ID_003").unwrap())
            .await
            .unwrap();
        assert_eq!(carol.identity.status, IdentityStatus::Revoked);

        assert_eq!(run_once(&bridge).await.unwrap(), 0);
        let status = bridge.get_sync_status();
        assert_eq!(status.last_result.map(|r| r.synced_count), Some(3));
    }

    #[tokio::test]
    async fn contract_violation_in_fixture_is_reported() {
        let bad: Fixture = serde_json::from_str(
            r#"{ "identities": [ {
                "identityId": "ID_009", "owner": "dave", "identityProvider": "kyc-1",
                "identityType": "PHONE",
                "grants": [ { "consumer": "acme", "permissionType": "READ_ONLY", "dataTypes": ["APP_USAGE"] } ]
            } ] }"#,
        )
        .unwrap();
        let err = build_bridge(BridgeConfig::default(), &bad).await.unwrap_err();
        assert!(format!("{err:#}").contains("ID_009"));
    }
}
