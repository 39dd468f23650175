//! # Trusted Issuer Key Ring
//!
//! Maps identity-provider accounts to the public keys a verifier accepts
//! proofs from. Lookups are concurrent with rotation; rotation replaces the
//! key atomically.

use std::collections::HashMap;

use dsov_core::{AccountId, CanonicalBytes, CryptoError};
use parking_lot::RwLock;

use crate::ed25519::{verify_with_public_key, Ed25519PublicKey, Ed25519Signature};
use crate::signer::SignerSet;

/// Public keys of trusted proof issuers.
#[derive(Debug, Default)]
pub struct TrustedKeys {
    keys: RwLock<HashMap<AccountId, Ed25519PublicKey>>,
}

impl TrustedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key ring trusting exactly the given signers.
    pub fn from_signers(signers: &SignerSet) -> Self {
        let ring = Self::new();
        for (account, key) in signers.public_keys() {
            ring.trust(account, key);
        }
        ring
    }

    /// Trust `key` for `issuer`, replacing any earlier key.
    pub fn trust(&self, issuer: AccountId, key: Ed25519PublicKey) {
        self.keys.write().insert(issuer, key);
    }

    /// Stop trusting `issuer`. Returns the removed key.
    pub fn distrust(&self, issuer: &AccountId) -> Option<Ed25519PublicKey> {
        self.keys.write().remove(issuer)
    }

    pub fn get(&self, issuer: &AccountId) -> Option<Ed25519PublicKey> {
        self.keys.read().get(issuer).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Verify `signature` over `data` as issued by `issuer`.
    ///
    /// # Errors
    ///
    /// `KeyError` if the issuer is unknown, `VerificationFailed` if the
    /// signature does not match the issuer's key.
    pub fn verify(
        &self,
        issuer: &AccountId,
        data: &CanonicalBytes,
        signature: &Ed25519Signature,
    ) -> Result<(), CryptoError> {
        let key = self
            .get(issuer)
            .ok_or_else(|| CryptoError::KeyError(format!("untrusted issuer: {issuer}")))?;
        verify_with_public_key(data, signature, &key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ed25519::Ed25519KeyPair;
    use crate::signer::{LocalSigner, ProofSigner};
    use std::sync::Arc;

    fn acct(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    #[test]
    fn verifies_trusted_issuer() {
        let signer = LocalSigner::generate(acct("provider-1"));
        let body = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        let sig = signer.sign(&body).unwrap();
        let ring = TrustedKeys::new();
        ring.trust(acct("provider-1"), signer.public_key());
        ring.verify(&acct("provider-1"), &body, &sig).unwrap();
    }

    #[test]
    fn unknown_issuer_is_key_error() {
        let body = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        let sig = Ed25519KeyPair::generate().sign(&body);
        let ring = TrustedKeys::new();
        assert!(matches!(
            ring.verify(&acct("nobody"), &body, &sig),
            Err(CryptoError::KeyError(_))
        ));
    }

    #[test]
    fn rotation_invalidates_old_signatures() {
        let old = Ed25519KeyPair::from_seed(&[3; 32]);
        let new = Ed25519KeyPair::from_seed(&[4; 32]);
        let body = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        let sig = old.sign(&body);
        let ring = TrustedKeys::new();
        ring.trust(acct("p"), old.public_key());
        assert!(ring.verify(&acct("p"), &body, &sig).is_ok());
        ring.trust(acct("p"), new.public_key());
        assert!(ring.verify(&acct("p"), &body, &sig).is_err());
        assert!(ring.distrust(&acct("p")).is_some());
        assert!(ring.is_empty());
    }

    #[test]
    fn from_signers_trusts_each_signer() {
        let set = SignerSet::new()
            .with(Arc::new(LocalSigner::generate(acct("a"))))
            .with(Arc::new(LocalSigner::generate(acct("b"))));
        let ring = TrustedKeys::from_signers(&set);
        assert_eq!(ring.len(), 2);
        assert_eq!(
            ring.get(&acct("a")),
            Some(set.get(&acct("a")).unwrap().public_key())
        );
    }
}
