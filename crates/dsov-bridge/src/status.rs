//! Synchronizer state and run reports.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dsov_core::{IdentityId, Timestamp};

/// Per-cycle state machine:
/// Idle → Running → (Success | PartialFailure | Failed) → Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    Idle,
    Running,
    Success,
    PartialFailure,
    Failed,
}

impl SyncState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::PartialFailure | Self::Failed)
    }

    pub fn valid_transitions(&self) -> &'static [SyncState] {
        match self {
            Self::Idle => &[Self::Running],
            Self::Running => &[Self::Success, Self::PartialFailure, Self::Failed],
            Self::Success | Self::PartialFailure | Self::Failed => &[Self::Idle],
        }
    }

    pub fn can_transition_to(&self, next: SyncState) -> bool {
        self.valid_transitions().contains(&next)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::PartialFailure => "PARTIAL_FAILURE",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item that could not be reconciled, or the enumeration failure that
/// failed the whole cycle (`identity_id` absent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItemError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<IdentityId>,
    pub message: String,
    /// Whether the final error was transient (retries exhausted).
    pub transient: bool,
}

/// Report of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub run_id: Uuid,
    /// Terminal state the cycle reached.
    pub status: SyncState,
    pub synced_count: u64,
    pub failed_count: u64,
    pub errors: Vec<SyncItemError>,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub duration_ms: u64,
    /// `stop_sync` ended the cycle before its work set was exhausted.
    pub stopped_early: bool,
}

/// Process-wide synchronizer status. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStatus {
    pub state: SyncState,
    pub is_running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_run: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<SyncResult>,
    /// Items carried into the next cycle.
    pub pending_items: usize,
    pub cycles_completed: u64,
}

impl Default for BridgeStatus {
    fn default() -> Self {
        Self {
            state: SyncState::Idle,
            is_running: false,
            current_run: None,
            last_sync_at: None,
            last_result: None,
            pending_items: 0,
            cycles_completed: 0,
        }
    }
}
