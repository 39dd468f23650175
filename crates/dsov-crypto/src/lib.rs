//! # dsov-crypto: Proof Signing Primitives
//!
//! - **Ed25519** keys and signatures over `CanonicalBytes`, hex on the wire.
//! - **`ProofSigner`**, the signing capability the bridge calls; key custody
//!   stays behind this trait.
//! - **`TrustedKeys`**, the issuer key ring a verifier checks proofs against.
//!
//! ## Crate Policy
//!
//! - Depends only on `dsov-core` internally.
//! - Tests use real Ed25519; nothing cryptographic is mocked.

pub mod ed25519;
pub mod keyring;
pub mod signer;

pub use ed25519::{verify_with_public_key, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use keyring::TrustedKeys;
pub use signer::{LocalSigner, ProofSigner, SignerSet};
