//! # Synchronizer
//!
//! Reconciles marketplace-side cached state (access-gated listing
//! visibility) with identity-ledger state, one cycle at a time.
//!
//! At most one cycle runs at once: the running flag is claimed with a
//! compare-and-swap, and a start request that loses the race gets the
//! in-flight status back. A cycle enumerates identities changed since the
//! last successful enumeration, adds items carried over from earlier
//! transient failures or queued by ledger events, and reconciles each one.
//! A failed item never aborts the batch. `stop_sync` is observed before
//! each item.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};
use uuid::Uuid;

use dsov_core::{IdentityId, Timestamp};
use dsov_ledger_client::{with_retry, LedgerError, LedgerEvent};

use crate::bridge::Bridge;
use crate::status::{BridgeStatus, SyncItemError, SyncResult, SyncState};

/// Shared synchronizer state owned by a [`Bridge`].
#[derive(Debug, Default)]
pub(crate) struct SyncControl {
    running: AtomicBool,
    stop_requested: AtomicBool,
    status: RwLock<BridgeStatus>,
    carried: Mutex<BTreeSet<IdentityId>>,
}

/// Clears the running flag when the cycle ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Outcome of asking for a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(SyncResult),
    /// Another cycle was already running; its status is returned.
    InFlight(BridgeStatus),
}

/// Outcome of [`Bridge::start_sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStart {
    Started(BridgeStatus),
    InFlight(BridgeStatus),
}

impl SyncControl {
    /// Atomically move the running flag from false to true.
    fn claim(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn update_status(&self, f: impl FnOnce(&mut BridgeStatus)) {
        let mut status = self.status.write();
        f(&mut status);
        status.pending_items = self.carried.lock().len();
    }

    fn transition(status: &mut BridgeStatus, next: SyncState) {
        debug_assert!(
            status.state.can_transition_to(next),
            "sync state {} cannot move to {next}",
            status.state
        );
        status.state = next;
    }
}

enum ItemError {
    Ledger(LedgerError),
    Missing,
}

impl Bridge {
    /// Run one cycle on the current task, unless one is already running.
    pub async fn run_sync_cycle(&self) -> CycleOutcome {
        if !self.sync.claim() {
            return CycleOutcome::InFlight(self.get_sync_status());
        }
        let guard = RunningGuard(&self.sync.running);
        let run_id = self.begin_cycle();
        CycleOutcome::Completed(self.execute_cycle(run_id, guard).await)
    }

    /// Start a cycle on a background task. Requires a Tokio runtime.
    pub fn start_sync(self: &Arc<Self>) -> SyncStart {
        // Claimed here so a concurrent caller sees the cycle as running
        // before the spawned task is scheduled.
        if !self.sync.claim() {
            return SyncStart::InFlight(self.get_sync_status());
        }
        let run_id = self.begin_cycle();
        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            let guard = RunningGuard(&bridge.sync.running);
            bridge.execute_cycle(run_id, guard).await;
        });
        SyncStart::Started(self.get_sync_status())
    }

    /// Ask the running cycle to stop after its current item. Returns
    /// whether a cycle was running.
    pub fn stop_sync(&self) -> bool {
        let running = self.sync.running.load(Ordering::Acquire);
        if running {
            self.sync.stop_requested.store(true, Ordering::Release);
            info!("sync stop requested");
        }
        running
    }

    pub fn get_sync_status(&self) -> BridgeStatus {
        self.sync.status.read().clone()
    }

    /// Include `identity_id` in the next cycle regardless of its change time.
    pub fn queue_identity(&self, identity_id: IdentityId) {
        self.sync.carried.lock().insert(identity_id);
        self.sync.update_status(|_| {});
    }

    /// Queue identities named by ledger events until the stream closes.
    pub async fn track_events(&self, mut events: broadcast::Receiver<LedgerEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.queue_identity(event.identity_id),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Missed events are still caught by the changed-since scan.
                    warn!(skipped, "ledger event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Run a cycle every `sync_interval` until `shutdown` turns true or its
    /// sender is dropped. The first cycle starts immediately.
    pub async fn run_periodic(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.sync_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval = ?self.config.sync_interval, "periodic sync started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    if let CycleOutcome::InFlight(_) = self.run_sync_cycle().await {
                        info!("previous sync cycle still running, skipping tick");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("periodic sync stopped");
    }

    fn begin_cycle(&self) -> Uuid {
        let run_id = Uuid::new_v4();
        self.sync.stop_requested.store(false, Ordering::Release);
        self.sync.update_status(|s| {
            SyncControl::transition(s, SyncState::Running);
            s.is_running = true;
            s.current_run = Some(run_id);
        });
        run_id
    }

    async fn execute_cycle(&self, run_id: Uuid, _guard: RunningGuard<'_>) -> SyncResult {
        let started = Instant::now();
        let started_at = self.clock.now();
        let since = self.sync.status.read().last_sync_at;
        info!(%run_id, since = ?since, "sync cycle started");

        let mut synced_count = 0;
        let mut failed_count = 0;
        let mut errors = Vec::new();
        let mut stopped_early = false;
        let mut enumerated = false;

        let ledger = self.ledger.as_ref();
        match with_retry(&self.policy, "changed_since", || ledger.changed_since(since)).await {
            Err(e) => {
                warn!(%run_id, "identity ledger unreachable, cycle failed: {e}");
                errors.push(SyncItemError {
                    identity_id: None,
                    message: e.to_string(),
                    transient: e.is_transient(),
                });
            }
            Ok(changed) => {
                enumerated = true;
                let mut work: BTreeSet<IdentityId> = std::mem::take(&mut *self.sync.carried.lock());
                work.extend(changed);
                for id in work {
                    if stopped_early || self.sync.stop_requested.load(Ordering::Acquire) {
                        stopped_early = true;
                        self.sync.carried.lock().insert(id);
                        continue;
                    }
                    match self.reconcile_item(&id).await {
                        Ok(()) => synced_count += 1,
                        Err(e) => {
                            let (message, transient) = match e {
                                ItemError::Ledger(e) => (e.to_string(), e.is_transient()),
                                ItemError::Missing => {
                                    (format!("identity {id} not found on the identity ledger"), false)
                                }
                            };
                            warn!(%run_id, identity_id = %id, transient, "sync item failed: {message}");
                            failed_count += 1;
                            errors.push(SyncItemError {
                                identity_id: Some(id.clone()),
                                message,
                                transient,
                            });
                            // Terminal failures are final for this item.
                            if transient {
                                self.sync.carried.lock().insert(id);
                            }
                        }
                    }
                }
            }
        }

        let status = if !enumerated {
            SyncState::Failed
        } else if failed_count > 0 {
            SyncState::PartialFailure
        } else {
            SyncState::Success
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = SyncResult {
            run_id,
            status,
            synced_count,
            failed_count,
            errors,
            started_at,
            finished_at: self.clock.now(),
            duration_ms,
            stopped_early,
        };
        info!(
            %run_id,
            synced = synced_count,
            failed = failed_count,
            duration_ms,
            outcome = %status,
            "sync cycle finished"
        );

        self.finish_cycle(&result, enumerated.then_some(started_at));
        result
    }

    fn finish_cycle(&self, result: &SyncResult, last_sync_at: Option<Timestamp>) {
        self.sync.update_status(|s| {
            SyncControl::transition(s, result.status);
            SyncControl::transition(s, SyncState::Idle);
            s.is_running = false;
            s.current_run = None;
            if let Some(at) = last_sync_at {
                s.last_sync_at = Some(at);
            }
            s.last_result = Some(result.clone());
            s.cycles_completed += 1;
        });
    }

    async fn reconcile_item(&self, id: &IdentityId) -> Result<(), ItemError> {
        let ledger = self.ledger.as_ref();
        let identity = with_retry(&self.policy, "get_identity", || ledger.get_identity(id))
            .await
            .map_err(ItemError::Ledger)?
            .ok_or(ItemError::Missing)?;
        let marketplace = self.marketplace.as_ref();
        with_retry(&self.policy, "reconcile_identity", || {
            marketplace.reconcile_identity(&identity)
        })
        .await
        .map_err(ItemError::Ledger)?;
        Ok(())
    }
}
