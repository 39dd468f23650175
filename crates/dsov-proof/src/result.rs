//! Validation outcomes.

use serde::{Deserialize, Serialize};

use dsov_core::Timestamp;

/// Why a proof was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProofFailure {
    /// Signature does not verify, or the issuer is not trusted.
    BadSignature,
    /// `validUntil` (or the permission's `expiresAt`) has passed.
    Expired,
    /// The identity is no longer VERIFIED at the attested level.
    StateMismatch,
    /// The attested permission no longer grants access.
    AccessDenied,
    /// Current ledger state could not be read. Treated as a failure.
    LedgerUnavailable,
}

impl ProofFailure {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadSignature => "BAD_SIGNATURE",
            Self::Expired => "EXPIRED",
            Self::StateMismatch => "STATE_MISMATCH",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::LedgerUnavailable => "LEDGER_UNAVAILABLE",
        }
    }
}

impl std::fmt::Display for ProofFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of validating one proof.
///
/// Failures are listed in check order; the first is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub failures: Vec<ProofFailure>,
    pub checked_at: Timestamp,
}

impl ValidationResult {
    pub fn from_failures(failures: Vec<ProofFailure>, checked_at: Timestamp) -> Self {
        Self {
            is_valid: failures.is_empty(),
            failures,
            checked_at,
        }
    }

    pub fn rejected(failure: ProofFailure, checked_at: Timestamp) -> Self {
        Self::from_failures(vec![failure], checked_at)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// The failure to surface when only one is reported.
    pub fn authoritative_failure(&self) -> Option<ProofFailure> {
        self.failures.first().copied()
    }
}
