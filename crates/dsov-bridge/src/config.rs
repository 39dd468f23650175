//! Bridge configuration.
//!
//! Defaults suit a single synchronizer polling a nearby ledger. Override via
//! environment variables or explicit construction followed by
//! [`BridgeConfig::validate`].

use std::time::Duration;

use dsov_ledger_client::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Time between periodic sync cycles.
    pub sync_interval: Duration,
    /// Total attempts per adapter call, including the first.
    pub max_retry_attempts: u32,
    /// Linear backoff step between attempts.
    pub retry_base_delay: Duration,
    /// Deadline applied to each adapter call.
    pub proof_validation_timeout: Duration,
    /// Lifetime of issued proofs.
    pub proof_ttl: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(30),
            max_retry_attempts: 3,
            retry_base_delay: Duration::from_millis(250),
            proof_validation_timeout: Duration::from_secs(5),
            proof_ttl: Duration::from_secs(3600),
        }
    }
}

const MAX_RETRY_ATTEMPTS: u32 = 20;

impl BridgeConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DSOV_SYNC_INTERVAL_SECS` (default: 30)
    /// - `DSOV_MAX_RETRY_ATTEMPTS` (default: 3)
    /// - `DSOV_RETRY_BASE_DELAY_MS` (default: 250)
    /// - `DSOV_PROOF_VALIDATION_TIMEOUT_MS` (default: 5000)
    /// - `DSOV_PROOF_TTL_SECS` (default: 3600)
    ///
    /// A variable that is set but malformed is an error, never a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            sync_interval: env_u64(&lookup, "DSOV_SYNC_INTERVAL_SECS")?
                .map_or(defaults.sync_interval, Duration::from_secs),
            max_retry_attempts: match env_u64(&lookup, "DSOV_MAX_RETRY_ATTEMPTS")? {
                Some(n) => u32::try_from(n).map_err(|_| ConfigError::OutOfRange {
                    field: "max_retry_attempts",
                    reason: format!("{n} does not fit in u32"),
                })?,
                None => defaults.max_retry_attempts,
            },
            retry_base_delay: env_u64(&lookup, "DSOV_RETRY_BASE_DELAY_MS")?
                .map_or(defaults.retry_base_delay, Duration::from_millis),
            proof_validation_timeout: env_u64(&lookup, "DSOV_PROOF_VALIDATION_TIMEOUT_MS")?
                .map_or(defaults.proof_validation_timeout, Duration::from_millis),
            proof_ttl: env_u64(&lookup, "DSOV_PROOF_TTL_SECS")?
                .map_or(defaults.proof_ttl, Duration::from_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_interval.is_zero() {
            return Err(out_of_range("sync_interval", "must be non-zero"));
        }
        if !(1..=MAX_RETRY_ATTEMPTS).contains(&self.max_retry_attempts) {
            return Err(out_of_range(
                "max_retry_attempts",
                format!("must be 1..={MAX_RETRY_ATTEMPTS}, got {}", self.max_retry_attempts),
            ));
        }
        if self.proof_validation_timeout.is_zero() {
            return Err(out_of_range("proof_validation_timeout", "must be non-zero"));
        }
        if self.proof_ttl.is_zero() {
            return Err(out_of_range("proof_ttl", "must be non-zero"));
        }
        Ok(())
    }

    /// Retry policy for adapter calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retry_attempts,
            base_delay: self.retry_base_delay,
            call_timeout: self.proof_validation_timeout,
        }
    }
}

fn env_u64(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<u64>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Malformed { var, value: raw }),
    }
}

fn out_of_range(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a non-negative integer: {value:?}")]
    Malformed { var: &'static str, value: String },
    #[error("{field} {reason}")]
    OutOfRange { field: &'static str, reason: String },
}
