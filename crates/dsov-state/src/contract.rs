//! # Identity Ledger Contract
//!
//! Pure predicates over `(request, current, proposed, signers)`. A transition
//! either passes every clause or is rejected with the first failing clause;
//! there is no partial success and no I/O.
//!
//! ## Transitions
//!
//! ```text
//!            Register
//!               │
//!               ▼
//!           PENDING ──Verify──▶ VERIFIED ◀─┐ Update / GrantAccess / RevokeAccess
//!               │                  │   └───┘
//!               └──────Revoke──────┴──Revoke──▶ REVOKED (terminal)
//! ```
//!
//! SUSPENDED has no outgoing transition.
//!
//! ## Clause order
//!
//! Existence, precondition status, signers, immutable fields, request
//! limits, postconditions, then the frame check (nothing outside the
//! transition's write set changed). The first failure is returned.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dsov_core::identity::MAX_TX_REF_LEN;
use dsov_core::{
    AccountId, DataType, IdentityId, IdentityStatus, IdentityType, PermissionType, Timestamp,
    VerificationLevel,
};

use crate::record::{AccessPermission, DigitalIdentity, PersonalInfo};

/// Maximum number of data types in a single GrantAccess.
pub const MAX_DATA_TYPES_PER_GRANT: usize = 10;

/// Kinds of transition the contract recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionKind {
    Register,
    Verify,
    Update,
    Revoke,
    GrantAccess,
    RevokeAccess,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::Verify => "VERIFY",
            Self::Update => "UPDATE",
            Self::Revoke => "REVOKE",
            Self::GrantAccess => "GRANT_ACCESS",
            Self::RevokeAccess => "REVOKE_ACCESS",
        }
    }

    /// Statuses the current record may be in.
    pub fn allowed_from(&self) -> &'static [IdentityStatus] {
        match self {
            Self::Register => &[],
            Self::Verify => &[IdentityStatus::Pending],
            Self::Revoke => &[IdentityStatus::Pending, IdentityStatus::Verified],
            Self::Update | Self::GrantAccess | Self::RevokeAccess => &[IdentityStatus::Verified],
        }
    }

    /// Roles whose signature the transition requires.
    pub fn required_roles(&self) -> &'static [SignerRole] {
        match self {
            Self::Verify => &[SignerRole::IdentityProvider],
            Self::GrantAccess | Self::RevokeAccess => &[SignerRole::Owner],
            Self::Register | Self::Update | Self::Revoke => {
                &[SignerRole::Owner, SignerRole::IdentityProvider]
            }
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A party whose signature a transition may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerRole {
    Owner,
    IdentityProvider,
}

impl SignerRole {
    fn account<'a>(&self, owner: &'a AccountId, provider: &'a AccountId) -> &'a AccountId {
        match self {
            Self::Owner => owner,
            Self::IdentityProvider => provider,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::IdentityProvider => "identityProvider",
        }
    }
}

/// A requested transition and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionRequest {
    #[serde(rename_all = "camelCase")]
    Register {
        owner: AccountId,
        identity_provider: AccountId,
        identity_type: IdentityType,
        #[serde(default)]
        personal_info: PersonalInfo,
        #[serde(default)]
        metadata: BTreeMap<String, String>,
    },
    #[serde(rename_all = "camelCase")]
    Verify {
        verification_level: VerificationLevel,
        verification_method: String,
    },
    #[serde(rename_all = "camelCase")]
    Update {
        #[serde(default)]
        personal_info: Option<PersonalInfo>,
        #[serde(default)]
        metadata: Option<BTreeMap<String, String>>,
    },
    #[serde(rename_all = "camelCase")]
    Revoke { reason: String },
    #[serde(rename_all = "camelCase")]
    GrantAccess {
        consumer: AccountId,
        permission_type: PermissionType,
        data_types: Vec<DataType>,
        #[serde(default)]
        expires_at: Option<Timestamp>,
    },
    #[serde(rename_all = "camelCase")]
    RevokeAccess {
        consumer: AccountId,
        data_type: DataType,
    },
}

impl TransitionRequest {
    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::Register { .. } => TransitionKind::Register,
            Self::Verify { .. } => TransitionKind::Verify,
            Self::Update { .. } => TransitionKind::Update,
            Self::Revoke { .. } => TransitionKind::Revoke,
            Self::GrantAccess { .. } => TransitionKind::GrantAccess,
            Self::RevokeAccess { .. } => TransitionKind::RevokeAccess,
        }
    }
}

/// Accounts that signed a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signatories(BTreeSet<AccountId>);

impl Signatories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, account: AccountId) -> Self {
        self.0.insert(account);
        self
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.0.contains(account)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountId> {
        self.0.iter()
    }
}

impl FromIterator<AccountId> for Signatories {
    fn from_iter<I: IntoIterator<Item = AccountId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Stable identifier of a violated contract clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractClause {
    IdentityAlreadyExists,
    IdentityNotFound,
    InvalidStatus,
    MissingSigner,
    ImmutableFieldChanged,
    FieldLength,
    DataTypeCount,
    StatusPostcondition,
    VerificationLevelPostcondition,
    MissingTimestamp,
    VerificationMethodPostcondition,
    RevocationPostcondition,
    PermissionCount,
    PermissionShape,
    NoMatchingPermission,
    UnexpectedFieldChange,
    OracleNotActive,
}

impl ContractClause {
    pub fn code(&self) -> &'static str {
        match self {
            Self::IdentityAlreadyExists => "IDENTITY_ALREADY_EXISTS",
            Self::IdentityNotFound => "IDENTITY_NOT_FOUND",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::MissingSigner => "MISSING_SIGNER",
            Self::ImmutableFieldChanged => "IMMUTABLE_FIELD_CHANGED",
            Self::FieldLength => "FIELD_LENGTH",
            Self::DataTypeCount => "DATA_TYPE_COUNT",
            Self::StatusPostcondition => "STATUS_POSTCONDITION",
            Self::VerificationLevelPostcondition => "VERIFICATION_LEVEL_POSTCONDITION",
            Self::MissingTimestamp => "MISSING_TIMESTAMP",
            Self::VerificationMethodPostcondition => "VERIFICATION_METHOD_POSTCONDITION",
            Self::RevocationPostcondition => "REVOCATION_POSTCONDITION",
            Self::PermissionCount => "PERMISSION_COUNT",
            Self::PermissionShape => "PERMISSION_SHAPE",
            Self::NoMatchingPermission => "NO_MATCHING_PERMISSION",
            Self::UnexpectedFieldChange => "UNEXPECTED_FIELD_CHANGE",
            Self::OracleNotActive => "ORACLE_NOT_ACTIVE",
        }
    }
}

impl std::fmt::Display for ContractClause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A requested transition failed a contract clause. Terminal for that
/// transaction; the contract never retries.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{transition} rejected [{clause}]: {detail}")]
pub struct ContractViolation {
    pub transition: TransitionKind,
    pub clause: ContractClause,
    pub detail: String,
}

impl ContractViolation {
    pub fn new(transition: TransitionKind, clause: ContractClause, detail: impl Into<String>) -> Self {
        Self {
            transition,
            clause,
            detail: detail.into(),
        }
    }
}

struct Clauses {
    kind: TransitionKind,
}

impl Clauses {
    fn ensure(
        &self,
        holds: bool,
        clause: ContractClause,
        detail: impl FnOnce() -> String,
    ) -> Result<(), ContractViolation> {
        if holds {
            Ok(())
        } else {
            Err(ContractViolation::new(self.kind, clause, detail()))
        }
    }

    fn signers(
        &self,
        owner: &AccountId,
        provider: &AccountId,
        signers: &Signatories,
    ) -> Result<(), ContractViolation> {
        for role in self.kind.required_roles() {
            let account = role.account(owner, provider);
            self.ensure(signers.contains(account), ContractClause::MissingSigner, || {
                format!("{} {account} did not sign", role.as_str())
            })?;
        }
        Ok(())
    }

    fn text_field(&self, field: &str, value: &str) -> Result<(), ContractViolation> {
        self.ensure(
            !value.trim().is_empty() && value.len() <= MAX_TX_REF_LEN,
            ContractClause::FieldLength,
            || format!("{field} must be 1..={MAX_TX_REF_LEN} bytes, got {}", value.len()),
        )
    }
}

/// Check a proposed record against the contract.
///
/// `current` is the record before the transition (`None` for Register).
pub fn check_transition(
    request: &TransitionRequest,
    current: Option<&DigitalIdentity>,
    proposed: &DigitalIdentity,
    signers: &Signatories,
) -> Result<(), ContractViolation> {
    let kind = request.kind();
    let c = Clauses { kind };

    let current = match (kind, current) {
        (TransitionKind::Register, Some(existing)) => {
            return Err(ContractViolation::new(
                kind,
                ContractClause::IdentityAlreadyExists,
                format!("identity {} is already registered", existing.identity_id),
            ));
        }
        (TransitionKind::Register, None) => return check_register(&c, request, proposed, signers),
        (_, None) => {
            return Err(ContractViolation::new(
                kind,
                ContractClause::IdentityNotFound,
                format!("identity {} is not registered", proposed.identity_id),
            ));
        }
        (_, Some(existing)) => existing,
    };

    c.ensure(
        kind.allowed_from().contains(&current.status),
        ContractClause::InvalidStatus,
        || format!("cannot {kind} from {}", current.status),
    )?;
    c.signers(&current.owner, &current.identity_provider, signers)?;
    c.ensure(
        current.identity_id == proposed.identity_id
            && current.owner == proposed.owner
            && current.identity_provider == proposed.identity_provider
            && current.identity_type == proposed.identity_type
            && current.created_at == proposed.created_at,
        ContractClause::ImmutableFieldChanged,
        || "identityId, owner, identityProvider, identityType and createdAt are immutable".into(),
    )?;

    match request {
        TransitionRequest::Register { .. } => {}
        TransitionRequest::Verify {
            verification_level,
            verification_method,
        } => {
            c.text_field("verificationMethod", verification_method)?;
            c.ensure(
                proposed.status == IdentityStatus::Verified,
                ContractClause::StatusPostcondition,
                || format!("status must become VERIFIED, got {}", proposed.status),
            )?;
            c.ensure(
                proposed.verification_level != VerificationLevel::None
                    && proposed.verification_level == *verification_level,
                ContractClause::VerificationLevelPostcondition,
                || {
                    format!(
                        "verificationLevel must be {verification_level} and not NONE, got {}",
                        proposed.verification_level
                    )
                },
            )?;
            c.ensure(
                proposed.verified_at.is_some(),
                ContractClause::MissingTimestamp,
                || "verifiedAt must be set".into(),
            )?;
            c.ensure(
                proposed.verification_method.as_deref() == Some(verification_method.as_str()),
                ContractClause::VerificationMethodPostcondition,
                || "verificationMethod must be recorded".into(),
            )?;
        }
        TransitionRequest::Update {
            personal_info,
            metadata,
        } => {
            c.ensure(
                proposed.status == IdentityStatus::Verified,
                ContractClause::StatusPostcondition,
                || format!("status must remain VERIFIED, got {}", proposed.status),
            )?;
            c.ensure(
                proposed.updated_at.is_some(),
                ContractClause::MissingTimestamp,
                || "updatedAt must be set".into(),
            )?;
            let expected_info = personal_info.as_ref().unwrap_or(&current.personal_info);
            let expected_meta = metadata.as_ref().unwrap_or(&current.metadata);
            c.ensure(
                &proposed.personal_info == expected_info && &proposed.metadata == expected_meta,
                ContractClause::UnexpectedFieldChange,
                || "personalInfo/metadata do not match the request".into(),
            )?;
        }
        TransitionRequest::Revoke { reason } => {
            c.text_field("revocationReason", reason)?;
            c.ensure(
                proposed.status == IdentityStatus::Revoked,
                ContractClause::StatusPostcondition,
                || format!("status must become REVOKED, got {}", proposed.status),
            )?;
            c.ensure(
                proposed.revoked_at.is_some()
                    && proposed.revocation_reason.as_deref() == Some(reason.as_str()),
                ContractClause::RevocationPostcondition,
                || "revokedAt and revocationReason must be set together".into(),
            )?;
        }
        TransitionRequest::GrantAccess {
            consumer,
            permission_type,
            data_types,
            expires_at,
        } => {
            c.ensure(
                (1..=MAX_DATA_TYPES_PER_GRANT).contains(&data_types.len()),
                ContractClause::DataTypeCount,
                || {
                    format!(
                        "dataTypes must have 1..={MAX_DATA_TYPES_PER_GRANT} entries, got {}",
                        data_types.len()
                    )
                },
            )?;
            permission_list_postconditions(&c, current, proposed)?;
            c.ensure(
                proposed.access_permissions.len() == current.access_permissions.len() + 1,
                ContractClause::PermissionCount,
                || {
                    format!(
                        "permission count must grow by exactly one ({} -> {})",
                        current.access_permissions.len(),
                        proposed.access_permissions.len()
                    )
                },
            )?;
            let (existing, added) = proposed
                .access_permissions
                .split_at(current.access_permissions.len());
            c.ensure(
                existing == current.access_permissions.as_slice(),
                ContractClause::UnexpectedFieldChange,
                || "existing permissions must not change".into(),
            )?;
            let wanted: BTreeSet<DataType> = data_types.iter().copied().collect();
            let shape_ok = added.first().map_or(false, |p| {
                &p.consumer == consumer
                    && p.permission_type == *permission_type
                    && p.data_types == wanted
                    && p.expires_at == *expires_at
                    && p.is_active
                    && p.granted_by == current.owner
                    && p.expires_at.map_or(true, |exp| exp > p.granted_at)
            });
            c.ensure(shape_ok, ContractClause::PermissionShape, || {
                format!(
                    "new permission must be active, granted by {}, match the request, and expire after grantedAt",
                    current.owner
                )
            })?;
        }
        TransitionRequest::RevokeAccess {
            consumer,
            data_type,
        } => {
            let matching = current.count_matching(consumer, *data_type);
            c.ensure(matching > 0, ContractClause::NoMatchingPermission, || {
                format!("no permission for {consumer} covers {data_type}")
            })?;
            permission_list_postconditions(&c, current, proposed)?;
            c.ensure(
                proposed.access_permissions.len() == current.access_permissions.len() - matching,
                ContractClause::PermissionCount,
                || {
                    format!(
                        "permission count must shrink by {matching} ({} -> {})",
                        current.access_permissions.len(),
                        proposed.access_permissions.len()
                    )
                },
            )?;
            let kept: Vec<&AccessPermission> = current
                .access_permissions
                .iter()
                .filter(|p| !p.matches(consumer, *data_type))
                .collect();
            c.ensure(
                proposed.access_permissions.iter().eq(kept),
                ContractClause::UnexpectedFieldChange,
                || "only the matching permissions may be removed".into(),
            )?;
        }
    }

    c.ensure(
        frame(current, kind) == frame(proposed, kind),
        ContractClause::UnexpectedFieldChange,
        || format!("{kind} modified a field outside its write set"),
    )
}

fn permission_list_postconditions(
    c: &Clauses,
    current: &DigitalIdentity,
    proposed: &DigitalIdentity,
) -> Result<(), ContractViolation> {
    c.ensure(
        proposed.status == current.status,
        ContractClause::StatusPostcondition,
        || format!("status must remain {}, got {}", current.status, proposed.status),
    )?;
    c.ensure(
        proposed.updated_at.is_some(),
        ContractClause::MissingTimestamp,
        || "updatedAt must be set".into(),
    )
}

fn check_register(
    c: &Clauses,
    request: &TransitionRequest,
    proposed: &DigitalIdentity,
    signers: &Signatories,
) -> Result<(), ContractViolation> {
    let TransitionRequest::Register {
        owner,
        identity_provider,
        identity_type,
        personal_info,
        metadata,
    } = request
    else {
        return Err(ContractViolation::new(
            c.kind,
            ContractClause::UnexpectedFieldChange,
            "register checked against a non-register request",
        ));
    };

    c.signers(&proposed.owner, &proposed.identity_provider, signers)?;
    c.ensure(
        proposed.status == IdentityStatus::Pending,
        ContractClause::StatusPostcondition,
        || format!("status must start PENDING, got {}", proposed.status),
    )?;
    c.ensure(
        proposed.verification_level == VerificationLevel::None,
        ContractClause::VerificationLevelPostcondition,
        || format!("verificationLevel must start NONE, got {}", proposed.verification_level),
    )?;

    let mut expected = DigitalIdentity::registered(
        proposed.identity_id.clone(),
        owner.clone(),
        identity_provider.clone(),
        *identity_type,
        proposed.created_at,
    );
    expected.personal_info = personal_info.clone();
    expected.metadata = metadata.clone();
    c.ensure(
        &expected == proposed,
        ContractClause::UnexpectedFieldChange,
        || "a new record carries only the registration fields".into(),
    )
}

/// The record with the transition's write set blanked out.
fn frame(record: &DigitalIdentity, kind: TransitionKind) -> DigitalIdentity {
    let mut f = record.clone();
    f.updated_at = None;
    match kind {
        TransitionKind::Register => {}
        TransitionKind::Verify => {
            f.status = IdentityStatus::Pending;
            f.verification_level = VerificationLevel::None;
            f.verified_at = None;
            f.verification_method = None;
        }
        TransitionKind::Update => {
            f.personal_info = PersonalInfo::default();
            f.metadata.clear();
        }
        TransitionKind::Revoke => {
            f.status = IdentityStatus::Pending;
            f.revoked_at = None;
            f.revocation_reason = None;
        }
        TransitionKind::GrantAccess | TransitionKind::RevokeAccess => {
            f.access_permissions.clear();
        }
    }
    f
}

/// Build the record a well-behaved ledger would write for `request`.
///
/// Fails only when the record's existence contradicts the request; every
/// other clause is left to [`check_transition`].
pub fn propose(
    identity_id: &IdentityId,
    request: &TransitionRequest,
    current: Option<&DigitalIdentity>,
    now: Timestamp,
) -> Result<DigitalIdentity, ContractViolation> {
    let kind = request.kind();
    if let TransitionRequest::Register {
        owner,
        identity_provider,
        identity_type,
        personal_info,
        metadata,
    } = request
    {
        if current.is_some() {
            return Err(ContractViolation::new(
                kind,
                ContractClause::IdentityAlreadyExists,
                format!("identity {identity_id} is already registered"),
            ));
        }
        let mut record = DigitalIdentity::registered(
            identity_id.clone(),
            owner.clone(),
            identity_provider.clone(),
            *identity_type,
            now,
        );
        record.personal_info = personal_info.clone();
        record.metadata = metadata.clone();
        return Ok(record);
    }

    let mut next = current.cloned().ok_or_else(|| {
        ContractViolation::new(
            kind,
            ContractClause::IdentityNotFound,
            format!("identity {identity_id} is not registered"),
        )
    })?;
    next.updated_at = Some(now);

    match request {
        TransitionRequest::Register { .. } => {}
        TransitionRequest::Verify {
            verification_level,
            verification_method,
        } => {
            next.status = IdentityStatus::Verified;
            next.verification_level = *verification_level;
            next.verified_at = Some(now);
            next.verification_method = Some(verification_method.clone());
        }
        TransitionRequest::Update {
            personal_info,
            metadata,
        } => {
            if let Some(info) = personal_info {
                next.personal_info = info.clone();
            }
            if let Some(meta) = metadata {
                next.metadata = meta.clone();
            }
        }
        TransitionRequest::Revoke { reason } => {
            next.status = IdentityStatus::Revoked;
            next.revoked_at = Some(now);
            next.revocation_reason = Some(reason.clone());
        }
        TransitionRequest::GrantAccess {
            consumer,
            permission_type,
            data_types,
            expires_at,
        } => {
            let granted_by = next.owner.clone();
            next.access_permissions.push(AccessPermission {
                consumer: consumer.clone(),
                permission_type: *permission_type,
                data_types: data_types.iter().copied().collect(),
                granted_at: now,
                expires_at: *expires_at,
                is_active: true,
                granted_by,
            });
        }
        TransitionRequest::RevokeAccess {
            consumer,
            data_type,
        } => {
            next.access_permissions
                .retain(|p| !p.matches(consumer, *data_type));
        }
    }
    Ok(next)
}

/// [`propose`] then [`check_transition`]. Returns the record to commit.
pub fn apply(
    identity_id: &IdentityId,
    request: &TransitionRequest,
    current: Option<&DigitalIdentity>,
    signers: &Signatories,
    now: Timestamp,
) -> Result<DigitalIdentity, ContractViolation> {
    let proposed = propose(identity_id, request, current, now)?;
    check_transition(request, current, &proposed, signers)?;
    Ok(proposed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn acct(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn id() -> IdentityId {
        IdentityId::new("ID_001").unwrap()
    }

    fn both() -> Signatories {
        Signatories::new().with(acct("owner")).with(acct("provider"))
    }

    fn register_req() -> TransitionRequest {
        TransitionRequest::Register {
            owner: acct("owner"),
            identity_provider: acct("provider"),
            identity_type: IdentityType::NationalId,
            personal_info: PersonalInfo::new().with("name", "enc:abc"),
            metadata: BTreeMap::new(),
        }
    }

    fn verify_req() -> TransitionRequest {
        TransitionRequest::Verify {
            verification_level: VerificationLevel::High,
            verification_method: "document-scan".into(),
        }
    }

    fn grant_req(consumer: &str, types: &[DataType]) -> TransitionRequest {
        TransitionRequest::GrantAccess {
            consumer: acct(consumer),
            permission_type: PermissionType::ReadOnly,
            data_types: types.to_vec(),
            expires_at: None,
        }
    }

    fn pending() -> DigitalIdentity {
        apply(&id(), &register_req(), None, &both(), ts("2026-01-01T00:00:00Z")).unwrap()
    }

    fn verified() -> DigitalIdentity {
        let p = pending();
        apply(&id(), &verify_req(), Some(&p), &both(), ts("2026-01-02T00:00:00Z")).unwrap()
    }

    fn clause(r: Result<DigitalIdentity, ContractViolation>) -> ContractClause {
        r.expect_err("transition should be rejected").clause
    }

    // ── Register ────────────────────────────────────────────────────

    #[test]
    fn register_creates_pending_record() {
        let r = pending();
        assert_eq!(r.status, IdentityStatus::Pending);
        assert_eq!(r.verification_level, VerificationLevel::None);
        assert_eq!(r.created_at, ts("2026-01-01T00:00:00Z"));
        assert!(r.verified_at.is_none() && r.access_permissions.is_empty());
    }

    #[test]
    fn register_twice_rejected() {
        let r = pending();
        let err = apply(&id(), &register_req(), Some(&r), &both(), ts("2026-01-03T00:00:00Z"))
            .unwrap_err();
        assert_eq!(err.clause, ContractClause::IdentityAlreadyExists);
        assert_eq!(err.transition, TransitionKind::Register);
    }

    #[test]
    fn register_requires_owner_and_provider() {
        let only_owner = Signatories::new().with(acct("owner"));
        let err = apply(&id(), &register_req(), None, &only_owner, ts("2026-01-01T00:00:00Z"))
            .unwrap_err();
        assert_eq!(err.clause, ContractClause::MissingSigner);
        assert!(err.detail.contains("identityProvider"));
    }

    #[test]
    fn register_rejects_pre_verified_proposal() {
        let mut forged = pending();
        forged.status = IdentityStatus::Verified;
        let r = check_transition(&register_req(), None, &forged, &both());
        assert_eq!(r.unwrap_err().clause, ContractClause::StatusPostcondition);

        let mut forged = pending();
        forged.verified_at = Some(ts("2026-01-01T00:00:00Z"));
        let r = check_transition(&register_req(), None, &forged, &both());
        assert_eq!(r.unwrap_err().clause, ContractClause::UnexpectedFieldChange);
    }

    // ── Verify ──────────────────────────────────────────────────────

    #[test]
    fn verify_sets_level_method_and_timestamp() {
        let v = verified();
        assert_eq!(v.status, IdentityStatus::Verified);
        assert_eq!(v.verification_level, VerificationLevel::High);
        assert_eq!(v.verified_at, Some(ts("2026-01-02T00:00:00Z")));
        assert_eq!(v.verification_method.as_deref(), Some("document-scan"));
    }

    #[test]
    fn verify_needs_only_provider() {
        let p = pending();
        let provider = Signatories::new().with(acct("provider"));
        assert!(apply(&id(), &verify_req(), Some(&p), &provider, ts("2026-01-02T00:00:00Z")).is_ok());
        let owner = Signatories::new().with(acct("owner"));
        assert_eq!(
            clause(apply(&id(), &verify_req(), Some(&p), &owner, ts("2026-01-02T00:00:00Z"))),
            ContractClause::MissingSigner
        );
    }

    #[test]
    fn verify_to_level_none_rejected() {
        let p = pending();
        let req = TransitionRequest::Verify {
            verification_level: VerificationLevel::None,
            verification_method: "x".into(),
        };
        assert_eq!(
            clause(apply(&id(), &req, Some(&p), &both(), ts("2026-01-02T00:00:00Z"))),
            ContractClause::VerificationLevelPostcondition
        );
    }

    #[test]
    fn verify_twice_rejected() {
        let v = verified();
        assert_eq!(
            clause(apply(&id(), &verify_req(), Some(&v), &both(), ts("2026-01-03T00:00:00Z"))),
            ContractClause::InvalidStatus
        );
    }

    #[test]
    fn verify_method_length_enforced() {
        let p = pending();
        let req = TransitionRequest::Verify {
            verification_level: VerificationLevel::Basic,
            verification_method: "m".repeat(129),
        };
        assert_eq!(
            clause(apply(&id(), &req, Some(&p), &both(), ts("2026-01-02T00:00:00Z"))),
            ContractClause::FieldLength
        );
    }

    // ── Update ──────────────────────────────────────────────────────

    #[test]
    fn update_changes_only_personal_info_and_metadata() {
        let v = verified();
        let req = TransitionRequest::Update {
            personal_info: Some(PersonalInfo::new().with("name", "enc:def")),
            metadata: None,
        };
        let u = apply(&id(), &req, Some(&v), &both(), ts("2026-01-05T00:00:00Z")).unwrap();
        assert_eq!(u.updated_at, Some(ts("2026-01-05T00:00:00Z")));
        assert_eq!(u.personal_info.0["name"], "enc:def");
        assert_eq!(u.verification_level, v.verification_level);
    }

    #[test]
    fn update_that_touches_owner_rejected() {
        let v = verified();
        let req = TransitionRequest::Update {
            personal_info: None,
            metadata: None,
        };
        let mut forged = propose(&id(), &req, Some(&v), ts("2026-01-05T00:00:00Z")).unwrap();
        forged.owner = acct("mallory");
        assert_eq!(
            check_transition(&req, Some(&v), &forged, &both()).unwrap_err().clause,
            ContractClause::ImmutableFieldChanged
        );
    }

    #[test]
    fn update_that_alters_permissions_rejected() {
        let v = apply(
            &id(),
            &grant_req("C1", &[DataType::AppUsage]),
            Some(&verified()),
            &both(),
            ts("2026-01-03T00:00:00Z"),
        )
        .unwrap();
        let req = TransitionRequest::Update {
            personal_info: None,
            metadata: None,
        };
        let mut forged = propose(&id(), &req, Some(&v), ts("2026-01-05T00:00:00Z")).unwrap();
        forged.access_permissions.clear();
        assert_eq!(
            check_transition(&req, Some(&v), &forged, &both()).unwrap_err().clause,
            ContractClause::UnexpectedFieldChange
        );
    }

    #[test]
    fn update_on_pending_rejected() {
        let req = TransitionRequest::Update {
            personal_info: None,
            metadata: None,
        };
        assert_eq!(
            clause(apply(&id(), &req, Some(&pending()), &both(), ts("2026-01-05T00:00:00Z"))),
            ContractClause::InvalidStatus
        );
    }

    // ── Revoke ──────────────────────────────────────────────────────

    #[test]
    fn revoke_from_pending_and_verified() {
        let req = TransitionRequest::Revoke {
            reason: "fraud".into(),
        };
        for start in [pending(), verified()] {
            let r = apply(&id(), &req, Some(&start), &both(), ts("2026-01-09T00:00:00Z")).unwrap();
            assert_eq!(r.status, IdentityStatus::Revoked);
            assert_eq!(r.revoked_at, Some(ts("2026-01-09T00:00:00Z")));
            assert_eq!(r.revocation_reason.as_deref(), Some("fraud"));
            assert_eq!(r.verified_at, start.verified_at);
        }
    }

    #[test]
    fn revoked_is_terminal() {
        let req = TransitionRequest::Revoke {
            reason: "fraud".into(),
        };
        let r = apply(&id(), &req, Some(&verified()), &both(), ts("2026-01-09T00:00:00Z")).unwrap();
        assert_eq!(
            clause(apply(&id(), &req, Some(&r), &both(), ts("2026-01-10T00:00:00Z"))),
            ContractClause::InvalidStatus
        );
        assert_eq!(
            clause(apply(&id(), &verify_req(), Some(&r), &both(), ts("2026-01-10T00:00:00Z"))),
            ContractClause::InvalidStatus
        );
    }

    #[test]
    fn revoke_without_reason_rejected() {
        let req = TransitionRequest::Revoke { reason: "  ".into() };
        assert_eq!(
            clause(apply(&id(), &req, Some(&verified()), &both(), ts("2026-01-09T00:00:00Z"))),
            ContractClause::FieldLength
        );
    }

    #[test]
    fn revoke_with_reason_but_no_timestamp_rejected() {
        let v = verified();
        let req = TransitionRequest::Revoke {
            reason: "fraud".into(),
        };
        let mut forged = propose(&id(), &req, Some(&v), ts("2026-01-09T00:00:00Z")).unwrap();
        forged.revoked_at = None;
        assert_eq!(
            check_transition(&req, Some(&v), &forged, &both()).unwrap_err().clause,
            ContractClause::RevocationPostcondition
        );
    }

    #[test]
    fn suspended_has_no_transitions() {
        let mut s = verified();
        s.status = IdentityStatus::Suspended;
        let reqs = [
            verify_req(),
            TransitionRequest::Revoke { reason: "r".into() },
            grant_req("C1", &[DataType::AppUsage]),
        ];
        for req in reqs {
            assert_eq!(
                clause(apply(&id(), &req, Some(&s), &both(), ts("2026-01-09T00:00:00Z"))),
                ContractClause::InvalidStatus
            );
        }
    }

    // ── GrantAccess / RevokeAccess ──────────────────────────────────

    #[test]
    fn grant_appends_owner_granted_active_permission() {
        let v = verified();
        let owner_only = Signatories::new().with(acct("owner"));
        let g = apply(
            &id(),
            &grant_req("C1", &[DataType::LocationHistory, DataType::LocationHistory]),
            Some(&v),
            &owner_only,
            ts("2026-01-03T00:00:00Z"),
        )
        .unwrap();
        assert_eq!(g.access_permissions.len(), 1);
        let p = &g.access_permissions[0];
        assert!(p.is_active);
        assert_eq!(p.granted_by, acct("owner"));
        assert_eq!(p.data_types.len(), 1);
        assert_eq!(g.status, IdentityStatus::Verified);
        assert!(g.has_access(&acct("C1"), DataType::LocationHistory, ts("2026-01-04T00:00:00Z")));
    }

    #[test]
    fn grant_data_type_count_bounds() {
        let v = verified();
        assert_eq!(
            clause(apply(&id(), &grant_req("C1", &[]), Some(&v), &both(), ts("2026-01-03T00:00:00Z"))),
            ContractClause::DataTypeCount
        );
        let eleven = vec![DataType::AppUsage; 11];
        assert_eq!(
            clause(apply(&id(), &grant_req("C1", &eleven), Some(&v), &both(), ts("2026-01-03T00:00:00Z"))),
            ContractClause::DataTypeCount
        );
    }

    #[test]
    fn grant_expiring_before_grant_time_rejected() {
        let req = TransitionRequest::GrantAccess {
            consumer: acct("C1"),
            permission_type: PermissionType::Analyze,
            data_types: vec![DataType::HealthData],
            expires_at: Some(ts("2026-01-03T00:00:00Z")),
        };
        assert_eq!(
            clause(apply(&id(), &req, Some(&verified()), &both(), ts("2026-01-03T00:00:00Z"))),
            ContractClause::PermissionShape
        );
    }

    #[test]
    fn grant_by_provider_alone_rejected() {
        let provider = Signatories::new().with(acct("provider"));
        assert_eq!(
            clause(apply(
                &id(),
                &grant_req("C1", &[DataType::AppUsage]),
                Some(&verified()),
                &provider,
                ts("2026-01-03T00:00:00Z")
            )),
            ContractClause::MissingSigner
        );
    }

    #[test]
    fn forged_grant_adding_two_entries_rejected() {
        let v = verified();
        let req = grant_req("C1", &[DataType::AppUsage]);
        let mut forged = propose(&id(), &req, Some(&v), ts("2026-01-03T00:00:00Z")).unwrap();
        let dup = forged.access_permissions[0].clone();
        forged.access_permissions.push(dup);
        assert_eq!(
            check_transition(&req, Some(&v), &forged, &both()).unwrap_err().clause,
            ContractClause::PermissionCount
        );
    }

    #[test]
    fn revoke_access_removes_every_matching_entry() {
        let mut v = verified();
        for (consumer, types) in [
            ("C1", vec![DataType::LocationHistory]),
            ("C2", vec![DataType::LocationHistory]),
            ("C1", vec![DataType::LocationHistory, DataType::AppUsage]),
        ] {
            v = apply(&id(), &grant_req(consumer, &types), Some(&v), &both(), ts("2026-01-03T00:00:00Z"))
                .unwrap();
        }
        let req = TransitionRequest::RevokeAccess {
            consumer: acct("C1"),
            data_type: DataType::LocationHistory,
        };
        let r = apply(&id(), &req, Some(&v), &both(), ts("2026-01-04T00:00:00Z")).unwrap();
        assert_eq!(r.access_permissions.len(), 1);
        assert_eq!(r.access_permissions[0].consumer, acct("C2"));
        assert!(!r.has_access(&acct("C1"), DataType::AppUsage, ts("2026-01-05T00:00:00Z")));
    }

    #[test]
    fn revoke_access_without_match_rejected() {
        let req = TransitionRequest::RevokeAccess {
            consumer: acct("C1"),
            data_type: DataType::LocationHistory,
        };
        assert_eq!(
            clause(apply(&id(), &req, Some(&verified()), &both(), ts("2026-01-04T00:00:00Z"))),
            ContractClause::NoMatchingPermission
        );
    }

    #[test]
    fn missing_record_is_not_found() {
        assert_eq!(
            clause(apply(&id(), &verify_req(), None, &both(), ts("2026-01-04T00:00:00Z"))),
            ContractClause::IdentityNotFound
        );
    }

    #[test]
    fn violation_display_includes_clause_code() {
        let err = apply(&id(), &verify_req(), None, &both(), ts("2026-01-04T00:00:00Z")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("VERIFY rejected [IDENTITY_NOT_FOUND]"), "{msg}");
    }

    #[test]
    fn request_json_is_tagged_by_kind() {
        let json = serde_json::to_value(grant_req("C1", &[DataType::AppUsage])).unwrap();
        assert_eq!(json["kind"], "GRANT_ACCESS");
        assert_eq!(json["permissionType"], "READ_ONLY");
        assert_eq!(json["dataTypes"][0], "APP_USAGE");
        let back: TransitionRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), TransitionKind::GrantAccess);
    }
}
