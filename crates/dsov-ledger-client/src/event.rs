//! Identity-ledger events, one per accepted transition.

use serde::{Deserialize, Serialize};

use dsov_core::{IdentityId, Timestamp, TxRef};
use dsov_state::TransitionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEventType {
    IdentityRegistered,
    IdentityVerified,
    IdentityUpdated,
    IdentityRevoked,
    AccessGranted,
    AccessRevoked,
}

impl From<TransitionKind> for LedgerEventType {
    fn from(kind: TransitionKind) -> Self {
        match kind {
            TransitionKind::Register => Self::IdentityRegistered,
            TransitionKind::Verify => Self::IdentityVerified,
            TransitionKind::Update => Self::IdentityUpdated,
            TransitionKind::Revoke => Self::IdentityRevoked,
            TransitionKind::GrantAccess => Self::AccessGranted,
            TransitionKind::RevokeAccess => Self::AccessRevoked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    pub event_type: LedgerEventType,
    pub identity_id: IdentityId,
    pub tx_ref: TxRef,
    pub occurred_at: Timestamp,
}
