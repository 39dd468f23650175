//! # Identity Records
//!
//! `DigitalIdentity` and `AccessPermission` as the Identity Ledger stores
//! them. Records are plain data; every mutation goes through
//! [`contract::apply`](crate::contract::apply).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use dsov_core::{
    AccountId, DataType, IdentityId, IdentityStatus, IdentityType, PermissionType, Timestamp,
    VerificationLevel,
};

/// Encrypted or otherwise opaque personal fields.
///
/// `Debug` prints only the field count so records can be logged without
/// leaking contents.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonalInfo(pub BTreeMap<String, String>);

impl PersonalInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for PersonalInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PersonalInfo(<{} fields redacted>)", self.0.len())
    }
}

/// A consumer's right to a set of data types of one identity.
///
/// Never mutated in place: created by GrantAccess, removed by RevokeAccess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPermission {
    pub consumer: AccountId,
    pub permission_type: PermissionType,
    pub data_types: BTreeSet<DataType>,
    pub granted_at: Timestamp,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    pub is_active: bool,
    pub granted_by: AccountId,
}

impl AccessPermission {
    /// Whether this entry is for `consumer` and lists `data_type`.
    pub fn matches(&self, consumer: &AccountId, data_type: DataType) -> bool {
        &self.consumer == consumer && self.data_types.contains(&data_type)
    }

    /// Whether this entry grants `consumer` access to `data_type` at `now`.
    pub fn grants(&self, consumer: &AccountId, data_type: DataType, now: Timestamp) -> bool {
        self.is_active
            && self.matches(consumer, data_type)
            && self.expires_at.map_or(true, |exp| now < exp)
    }
}

/// An identity record on the Identity Ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalIdentity {
    pub identity_id: IdentityId,
    pub owner: AccountId,
    pub identity_provider: AccountId,
    pub identity_type: IdentityType,
    pub status: IdentityStatus,
    pub verification_level: VerificationLevel,
    #[serde(default)]
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub access_permissions: Vec<AccessPermission>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub verified_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub revoked_at: Option<Timestamp>,
    #[serde(default)]
    pub revocation_reason: Option<String>,
    #[serde(default)]
    pub verification_method: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl DigitalIdentity {
    /// A freshly registered record: PENDING, level NONE, no permissions.
    pub fn registered(
        identity_id: IdentityId,
        owner: AccountId,
        identity_provider: AccountId,
        identity_type: IdentityType,
        created_at: Timestamp,
    ) -> Self {
        Self {
            identity_id,
            owner,
            identity_provider,
            identity_type,
            status: IdentityStatus::Pending,
            verification_level: VerificationLevel::None,
            personal_info: PersonalInfo::default(),
            access_permissions: Vec::new(),
            created_at,
            verified_at: None,
            updated_at: None,
            revoked_at: None,
            revocation_reason: None,
            verification_method: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == IdentityStatus::Verified
    }

    /// True iff the identity is VERIFIED and some active, unexpired
    /// permission for `consumer` lists `data_type`.
    pub fn has_access(&self, consumer: &AccountId, data_type: DataType, now: Timestamp) -> bool {
        self.granting_permission(consumer, data_type, now).is_some()
    }

    /// First permission in list order that satisfies [`has_access`](Self::has_access).
    pub fn granting_permission(
        &self,
        consumer: &AccountId,
        data_type: DataType,
        now: Timestamp,
    ) -> Option<&AccessPermission> {
        if !self.is_verified() {
            return None;
        }
        self.access_permissions
            .iter()
            .find(|p| p.grants(consumer, data_type, now))
    }

    /// Number of entries a RevokeAccess for `(consumer, data_type)` would remove.
    pub fn count_matching(&self, consumer: &AccountId, data_type: DataType) -> usize {
        self.access_permissions
            .iter()
            .filter(|p| p.matches(consumer, data_type))
            .count()
    }

    /// Latest of the record's lifecycle timestamps.
    pub fn last_changed_at(&self) -> Timestamp {
        [self.verified_at, self.updated_at, self.revoked_at]
            .into_iter()
            .flatten()
            .fold(self.created_at, std::cmp::max)
    }
}
