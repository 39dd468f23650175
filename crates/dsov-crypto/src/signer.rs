//! # Proof-Signing Capability
//!
//! The bridge signs proofs on behalf of identity providers but never holds
//! raw key material directly. It holds `Arc<dyn ProofSigner>` values keyed
//! by provider account; an HSM- or KMS-backed implementation plugs in here.

use std::collections::HashMap;
use std::sync::Arc;

use dsov_core::{AccountId, CanonicalBytes, CryptoError};

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Signs canonical proof bodies for one identity provider.
///
/// Object safe and `Send + Sync` so one signer set can be shared across
/// tasks. Signing never suspends.
pub trait ProofSigner: Send + Sync {
    /// Account whose key this signer holds.
    fn signer_id(&self) -> &AccountId;

    /// Public half, published in the verifier's key ring.
    fn public_key(&self) -> Ed25519PublicKey;

    /// Sign canonical bytes. Remote backends report failures as
    /// `CryptoError::KeyError`.
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError>;
}

/// In-process signer backed by an [`Ed25519KeyPair`].
#[derive(Debug)]
pub struct LocalSigner {
    account: AccountId,
    keypair: Ed25519KeyPair,
}

impl LocalSigner {
    pub fn new(account: AccountId, keypair: Ed25519KeyPair) -> Self {
        Self { account, keypair }
    }

    /// Fresh random key for `account`.
    pub fn generate(account: AccountId) -> Self {
        Self::new(account, Ed25519KeyPair::generate())
    }
}

impl ProofSigner for LocalSigner {
    fn signer_id(&self) -> &AccountId {
        &self.account
    }

    fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.keypair.sign(data))
    }
}

/// Signers available to the bridge, keyed by provider account.
#[derive(Clone, Default)]
pub struct SignerSet {
    signers: HashMap<AccountId, Arc<dyn ProofSigner>>,
}

impl SignerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signer. A later signer for the same account replaces the
    /// earlier one.
    pub fn insert(&mut self, signer: Arc<dyn ProofSigner>) {
        self.signers.insert(signer.signer_id().clone(), signer);
    }

    pub fn with(mut self, signer: Arc<dyn ProofSigner>) -> Self {
        self.insert(signer);
        self
    }

    pub fn get(&self, account: &AccountId) -> Option<&Arc<dyn ProofSigner>> {
        self.signers.get(account)
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    /// Public keys of every signer, for seeding a verifier's key ring.
    pub fn public_keys(&self) -> impl Iterator<Item = (AccountId, Ed25519PublicKey)> + '_ {
        self.signers
            .iter()
            .map(|(id, s)| (id.clone(), s.public_key()))
    }
}

impl std::fmt::Debug for SignerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.signers.keys().map(AccountId::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("SignerSet").field("signers", &ids).finish()
    }
}
