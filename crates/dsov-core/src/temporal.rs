//! # Temporal Types: UTC-Only Timestamps
//!
//! `Timestamp` is UTC with seconds precision and always renders as
//! `YYYY-MM-DDTHH:MM:SSZ`. Proof bodies embed timestamps, so two nodes that
//! disagree on sub-second digits or offset notation would sign different
//! bytes for the same instant.
//!
//! Strict parsing rejects any suffix other than `Z`. A lenient parser exists
//! for ingesting fixture files and external feeds.

use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DsovError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `DateTime<Utc>`, dropping sub-second digits.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string that ends in `Z`.
    ///
    /// `+00:00` is rejected even though it names the same instant.
    ///
    /// # Errors
    ///
    /// `DsovError::Timestamp` if the string is not RFC 3339 or carries an
    /// explicit offset.
    pub fn parse(s: &str) -> Result<Self, DsovError> {
        if !s.ends_with('Z') {
            return Err(DsovError::Timestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse an RFC 3339 string with any offset, converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, DsovError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            DsovError::Timestamp(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// From Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, DsovError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| DsovError::Timestamp(format!("invalid Unix timestamp: {secs}")))
    }

    /// The inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// `self + d`, truncated to whole seconds. `None` on overflow.
    pub fn checked_add(&self, d: Duration) -> Option<Self> {
        let secs = i64::try_from(d.as_secs()).ok()?;
        let delta = chrono::Duration::try_seconds(secs)?;
        self.0.checked_add_signed(delta).map(Self)
    }

    /// `self - d`, truncated to whole seconds. `None` on underflow.
    pub fn checked_sub(&self, d: Duration) -> Option<Self> {
        let secs = i64::try_from(d.as_secs()).ok()?;
        let delta = chrono::Duration::try_seconds(secs)?;
        self.0.checked_sub_signed(delta).map(Self)
    }

    /// Render as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl std::str::FromStr for Timestamp {
    type Err = DsovError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
