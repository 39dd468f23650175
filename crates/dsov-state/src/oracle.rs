//! # KYC Oracle Registry
//!
//! Identity providers stake to become verification oracles. A Verify
//! transition on a ledger configured with a registry requires the provider
//! to be a registered, active oracle.
//!
//! ## Lifecycle
//!
//! ```text
//! register (stake >= minimum) ──▶ ACTIVE ──slash (stake < minimum)──▶ INACTIVE
//!                                   │
//!                                   └──deactivate──▶ INACTIVE
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dsov_core::{AccountId, Timestamp};

use crate::contract::{ContractClause, ContractViolation, TransitionKind};

/// Reputation assigned at registration, in basis points.
pub const INITIAL_REPUTATION_BPS: u16 = 5000;

/// Maximum byte length of an oracle's display name.
pub const MAX_PROVIDER_NAME_LEN: usize = 64;

/// A registered verification oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycOracle {
    pub provider: AccountId,
    pub provider_name: String,
    pub stake_amount: u64,
    pub verification_count: u64,
    pub successful_verifications: u64,
    pub reputation_score: u16,
    pub is_active: bool,
    pub registered_at: Timestamp,
}

/// Errors from oracle registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("stake {stake} for {provider} is below the minimum {minimum}")]
    InsufficientStake {
        provider: AccountId,
        stake: u64,
        minimum: u64,
    },

    #[error("oracle {provider} is already registered")]
    AlreadyRegistered { provider: AccountId },

    #[error("oracle {provider} is not registered")]
    NotRegistered { provider: AccountId },

    #[error("provider name must be 1..={MAX_PROVIDER_NAME_LEN} bytes, got {len}")]
    InvalidName { len: usize },
}

/// Registry of staked KYC oracles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRegistry {
    pub minimum_stake: u64,
    pub slash_amount: u64,
    oracles: BTreeMap<AccountId, KycOracle>,
}

impl OracleRegistry {
    pub fn new(minimum_stake: u64, slash_amount: u64) -> Self {
        Self {
            minimum_stake,
            slash_amount,
            oracles: BTreeMap::new(),
        }
    }

    /// Register `provider` with `stake`. New oracles start active at
    /// [`INITIAL_REPUTATION_BPS`].
    pub fn register_oracle(
        &mut self,
        provider: AccountId,
        provider_name: impl Into<String>,
        stake: u64,
        now: Timestamp,
    ) -> Result<&KycOracle, OracleError> {
        let provider_name = provider_name.into();
        if provider_name.is_empty() || provider_name.len() > MAX_PROVIDER_NAME_LEN {
            return Err(OracleError::InvalidName {
                len: provider_name.len(),
            });
        }
        if stake < self.minimum_stake {
            return Err(OracleError::InsufficientStake {
                provider,
                stake,
                minimum: self.minimum_stake,
            });
        }
        if self.oracles.contains_key(&provider) {
            return Err(OracleError::AlreadyRegistered { provider });
        }
        let oracle = KycOracle {
            provider: provider.clone(),
            provider_name,
            stake_amount: stake,
            verification_count: 0,
            successful_verifications: 0,
            reputation_score: INITIAL_REPUTATION_BPS,
            is_active: true,
            registered_at: now,
        };
        Ok(self.oracles.entry(provider).or_insert(oracle))
    }

    pub fn get(&self, provider: &AccountId) -> Option<&KycOracle> {
        self.oracles.get(provider)
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }

    pub fn is_active(&self, provider: &AccountId) -> bool {
        self.oracles.get(provider).is_some_and(|o| o.is_active)
    }

    /// Contract clause for Verify: the provider must be an active oracle.
    pub fn require_active(&self, provider: &AccountId) -> Result<(), ContractViolation> {
        if self.is_active(provider) {
            Ok(())
        } else {
            Err(ContractViolation::new(
                TransitionKind::Verify,
                ContractClause::OracleNotActive,
                format!("{provider} is not an active KYC oracle"),
            ))
        }
    }

    /// Count a completed verification.
    pub fn record_verification(&mut self, provider: &AccountId) -> Result<(), OracleError> {
        let oracle = self.get_mut(provider)?;
        oracle.verification_count += 1;
        oracle.successful_verifications += 1;
        Ok(())
    }

    /// Burn `slash_amount` of the oracle's stake. Returns the remaining
    /// stake. The oracle is deactivated once its stake drops below the
    /// minimum.
    pub fn slash(&mut self, provider: &AccountId) -> Result<u64, OracleError> {
        let slash_amount = self.slash_amount;
        let minimum = self.minimum_stake;
        let oracle = self.get_mut(provider)?;
        oracle.stake_amount = oracle.stake_amount.saturating_sub(slash_amount);
        if oracle.stake_amount < minimum {
            oracle.is_active = false;
        }
        Ok(oracle.stake_amount)
    }

    pub fn deactivate(&mut self, provider: &AccountId) -> Result<(), OracleError> {
        self.get_mut(provider)?.is_active = false;
        Ok(())
    }

    fn get_mut(&mut self, provider: &AccountId) -> Result<&mut KycOracle, OracleError> {
        self.oracles
            .get_mut(provider)
            .ok_or_else(|| OracleError::NotRegistered {
                provider: provider.clone(),
            })
    }
}
