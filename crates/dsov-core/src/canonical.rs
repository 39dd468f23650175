//! # Canonical Serialization: JCS Byte Production
//!
//! `CanonicalBytes` is the only input accepted by the signing, verification,
//! and digest functions in this workspace. A proof issued on one node and
//! verified on another must hash to the same bytes, so every signed body
//! goes through one pipeline:
//!
//! 1. Serialize with `serde` into a JSON value tree.
//! 2. Reject floats anywhere in the tree. Prices, counters, and epochs are
//!    integers; timestamps are already strings via [`Timestamp`](crate::Timestamp).
//! 3. Emit RFC 8785 (JCS) bytes: sorted keys, compact separators, UTF-8.
//!
//! The inner buffer is private, so a caller cannot hand a signer bytes that
//! skipped step 2 or 3.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization with float rejection.
///
/// # Invariants
///
/// - The only constructor is [`CanonicalBytes::new()`].
/// - No float appears anywhere in the encoded value.
/// - Object keys are sorted and separators are compact (RFC 8785).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `FloatRejected` if the value contains a non-integer number,
    /// `SerializationFailed` if `serde` or JCS encoding fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let encoded = serde_jcs::to_string(&value)?;
        Ok(Self(encoded.into_bytes()))
    }

    /// The canonical byte sequence.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Walk the value tree and fail on the first float.
fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn canonical_str(v: &impl Serialize) -> String {
        let cb = CanonicalBytes::new(v).expect("should canonicalize");
        String::from_utf8(cb.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn keys_are_sorted() {
        let data = serde_json::json!({"owner": "alice", "identityId": "ID_001", "level": "HIGH"});
        assert_eq!(
            canonical_str(&data),
            r#"{"identityId":"ID_001","level":"HIGH","owner":"alice"}"#
        );
    }

    #[test]
    fn nested_objects_sorted_and_arrays_preserved() {
        let data = serde_json::json!({
            "proof": {"z": 1, "a": 2},
            "dataTypes": ["SEARCH_HISTORY", "APP_USAGE"]
        });
        assert_eq!(
            canonical_str(&data),
            r#"{"dataTypes":["SEARCH_HISTORY","APP_USAGE"],"proof":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn struct_field_order_does_not_matter() {
        #[derive(Serialize)]
        struct A {
            b: u32,
            a: u32,
        }
        #[derive(Serialize)]
        struct B {
            a: u32,
            b: u32,
        }
        let left = CanonicalBytes::new(&A { b: 2, a: 1 }).unwrap();
        let right = CanonicalBytes::new(&B { a: 1, b: 2 }).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn float_is_rejected() {
        let data = serde_json::json!({"price": 1.5});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 1.5),
            other => panic!("expected FloatRejected, got {other:?}"),
        }
    }

    #[test]
    fn deeply_nested_float_is_rejected() {
        let data = serde_json::json!({"a": [{"b": {"c": 0.25}}]});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn integers_null_and_bools_pass_through() {
        let data = serde_json::json!({"n": -42, "big": 9_999_999_999i64, "x": null, "t": true});
        assert_eq!(
            canonical_str(&data),
            r#"{"big":9999999999,"n":-42,"t":true,"x":null}"#
        );
    }

    #[test]
    fn empty_containers() {
        assert_eq!(CanonicalBytes::new(&serde_json::json!({})).unwrap().as_bytes(), b"{}");
        assert_eq!(CanonicalBytes::new(&serde_json::json!([])).unwrap().as_bytes(), b"[]");
    }

    #[test]
    fn non_ascii_is_emitted_as_utf8() {
        let mut m = BTreeMap::new();
        m.insert("name", "Zo\u{00eb}");
        let s = canonical_str(&m);
        assert!(s.contains('\u{00eb}'));
    }

    #[test]
    fn len_matches_bytes() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(cb.len(), cb.as_bytes().len());
        assert!(!cb.is_empty());
    }
}
