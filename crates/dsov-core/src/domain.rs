//! # Ledger Vocabulary
//!
//! Closed enums shared by the identity contract, the proof codec, and both
//! ledger adapters. Wire names are `SCREAMING_SNAKE_CASE`; `as_str()`,
//! `Display`, and `FromStr` all agree with the serde representation.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Implements `as_str`, `all`, `Display`, and `FromStr` for a unit-only enum
/// from one variant/name table.
macro_rules! wire_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Wire name of this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Every variant, in declaration order.
            pub fn all() -> &'static [$ty] {
                &[$(Self::$variant,)+]
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(ValidationError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Lifecycle status of a `DigitalIdentity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityStatus {
    /// Registered, awaiting verification.
    Pending,
    /// Verified by an identity provider.
    Verified,
    /// Permanently revoked. Terminal.
    Revoked,
    /// Administratively suspended. No contract transition leaves this state.
    Suspended,
}

wire_enum!(IdentityStatus, "identity status", {
    Pending => "PENDING",
    Verified => "VERIFIED",
    Revoked => "REVOKED",
    Suspended => "SUSPENDED",
});

impl IdentityStatus {
    /// Whether no contract transition can leave this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }
}

/// Assurance level attached by the verifying provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationLevel {
    None,
    Basic,
    Enhanced,
    High,
    Credential,
}

wire_enum!(VerificationLevel, "verification level", {
    None => "NONE",
    Basic => "BASIC",
    Enhanced => "ENHANCED",
    High => "HIGH",
    Credential => "CREDENTIAL",
});

/// Kind of credential backing a digital identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityType {
    NationalId,
    Passport,
    DriversLicense,
    Email,
    Phone,
    Corporate,
    Custom,
}

wire_enum!(IdentityType, "identity type", {
    NationalId => "NATIONAL_ID",
    Passport => "PASSPORT",
    DriversLicense => "DRIVERS_LICENSE",
    Email => "EMAIL",
    Phone => "PHONE",
    Corporate => "CORPORATE",
    Custom => "CUSTOM",
});

/// What a consumer may do with the data it was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionType {
    ReadOnly,
    ReadWrite,
    Share,
    Analyze,
    Export,
}

wire_enum!(PermissionType, "permission type", {
    ReadOnly => "READ_ONLY",
    ReadWrite => "READ_WRITE",
    Share => "SHARE",
    Analyze => "ANALYZE",
    Export => "EXPORT",
});

/// Category of personal data covered by a permission or listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    LocationHistory,
    AppUsage,
    PurchaseHistory,
    HealthData,
    SocialMediaActivity,
    SearchHistory,
    FinancialData,
    CommunicationData,
    Custom,
}

wire_enum!(DataType, "data type", {
    LocationHistory => "LOCATION_HISTORY",
    AppUsage => "APP_USAGE",
    PurchaseHistory => "PURCHASE_HISTORY",
    HealthData => "HEALTH_DATA",
    SocialMediaActivity => "SOCIAL_MEDIA_ACTIVITY",
    SearchHistory => "SEARCH_HISTORY",
    FinancialData => "FINANCIAL_DATA",
    CommunicationData => "COMMUNICATION_DATA",
    Custom => "CUSTOM",
});
