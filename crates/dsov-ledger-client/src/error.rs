//! Ledger adapter errors.

use thiserror::Error;

use dsov_state::ContractViolation;

/// Errors from Ledger A or Ledger B adapter calls.
///
/// [`LedgerError::is_transient`] splits them into retryable I/O failures
/// and terminal rejections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger could not be reached.
    #[error("ledger unavailable during {operation}: {reason}")]
    Unavailable {
        operation: &'static str,
        reason: String,
    },

    /// A single call exceeded its deadline.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: &'static str, after_ms: u64 },

    /// The ledger asked the caller to back off.
    #[error("{operation} rate limited")]
    RateLimited { operation: &'static str },

    /// The identity contract rejected a transition.
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),

    /// A supplied proof failed validation.
    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The request conflicts with current ledger state.
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// The ledger refused the request for any other reason.
    #[error("rejected: {reason}")]
    Rejected { reason: String },
}

impl LedgerError {
    /// Whether the call may succeed if repeated unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }
}
