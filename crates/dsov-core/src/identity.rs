//! # Identifier Newtypes
//!
//! An `IdentityId` cannot be passed where an `AccountId` is expected. String
//! identifiers validate at construction and again at deserialization, so a
//! fixture or gateway payload with an oversized id is rejected before it
//! reaches the contract.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum byte length of an identity identifier.
pub const MAX_IDENTITY_ID_LEN: usize = 64;

/// Maximum byte length of a transaction or storage reference.
pub const MAX_TX_REF_LEN: usize = 128;

/// Maximum byte length of an account identifier.
pub const MAX_ACCOUNT_ID_LEN: usize = 128;

/// Routes `Deserialize` through `new()` so invalid values fail to parse.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

fn check_bounded(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            max,
            actual: value.len(),
        });
    }
    if value.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(ValidationError::InvalidCharacters {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Identifier of a `DigitalIdentity`. Non-empty, at most 64 bytes, no
/// whitespace or control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        check_bounded("identityId", &s, MAX_IDENTITY_ID_LEN)?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl_validating_deserialize!(IdentityId);

/// A ledger account: an owner, an identity provider, or a data consumer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        check_bounded("accountId", &s, MAX_ACCOUNT_ID_LEN)?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl_validating_deserialize!(AccountId);

/// Reference to a ledger transaction, at most 128 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        check_bounded("txRef", &s, MAX_TX_REF_LEN)?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl_validating_deserialize!(TxRef);

/// Marketplace listing number, assigned sequentially by Ledger B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub u64);

macro_rules! impl_display_from_str {
    ($ty:ident) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

impl_display_from_str!(IdentityId);
impl_display_from_str!(AccountId);
impl_display_from_str!(TxRef);

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listing-{}", self.0)
    }
}
