//! # Error Types: Structured Error Hierarchy
//!
//! Defines the foundation error types shared across the workspace. All
//! errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! Higher layers define their own domain errors (`ContractViolation` in
//! `dsov-state`, `LedgerError` in `dsov-ledger-client`, `BridgeError` in
//! `dsov-bridge`) and wrap these where a lower-level failure surfaces.

use thiserror::Error;

/// Top-level error type for foundation operations.
#[derive(Error, Debug)]
pub enum DsovError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A value failed format validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A timestamp could not be parsed or computed.
    #[error("timestamp error: {0}")]
    Timestamp(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Prices and counters must be integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Hex decoding failed.
    #[error("hex decode error: {0}")]
    HexDecode(String),
}

/// An identifier or reference failed its format constraints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The value was empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The value exceeded its maximum byte length.
    #[error("{field} exceeds {max} bytes (got {actual})")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted length in bytes.
        max: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// The value contained characters outside the permitted set.
    #[error("{field} contains invalid characters: {value:?}")]
    InvalidCharacters {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// An enum name did not match any known variant.
    #[error("unknown {kind}: {value:?}")]
    UnknownVariant {
        /// Which enum was being parsed.
        kind: &'static str,
        /// The rejected name.
        value: String,
    },
}
