//! # Proof Subcommand
//!
//! Offline verification of a proof file: signature against a given public
//! key, then expiry. No ledger is consulted, so a revoked identity or a
//! withdrawn permission is not detected here.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};

use dsov_core::Timestamp;
use dsov_crypto::Ed25519PublicKey;
use dsov_proof::{AccessProof, IdentityProof, SignedProof, ValidationResult};

/// Arguments for `dsov proof`.
#[derive(Args, Debug)]
pub struct ProofArgs {
    #[command(subcommand)]
    pub command: ProofCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProofCommand {
    /// Check a proof's signature and expiry.
    Verify {
        /// Path to the issuer's public key file (hex-encoded 32 bytes).
        #[arg(long)]
        pubkey: PathBuf,
        /// Path to the proof JSON.
        #[arg(value_name = "PROOF")]
        file: PathBuf,
        /// Which kind of proof the file holds.
        #[arg(long, value_enum, default_value_t = ProofKind::Identity)]
        kind: ProofKind,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProofKind {
    Identity,
    Access,
}

pub fn run_proof(args: &ProofArgs) -> Result<u8> {
    match &args.command {
        ProofCommand::Verify { pubkey, file, kind } => cmd_verify(pubkey, file, *kind, Timestamp::now()),
    }
}

fn cmd_verify(pubkey_path: &Path, proof_path: &Path, kind: ProofKind, now: Timestamp) -> Result<u8> {
    let key_hex = crate::read_file(pubkey_path, "public key")?;
    let key = Ed25519PublicKey::from_hex(key_hex.trim())
        .map_err(|e| anyhow::anyhow!("invalid public key: {e}"))?;

    let content = crate::read_file(proof_path, "proof")?;
    let result = match kind {
        ProofKind::Identity => {
            let proof: IdentityProof = serde_json::from_str(&content)
                .with_context(|| format!("not an identity proof: {}", proof_path.display()))?;
            proof.verify_offline(&key, now)
        }
        ProofKind::Access => {
            let proof: AccessProof = serde_json::from_str(&content)
                .with_context(|| format!("not an access proof: {}", proof_path.display()))?;
            proof.verify_offline(&key, now)
        }
    };
    report(&result)
}

fn report(result: &ValidationResult) -> Result<u8> {
    println!("{}", serde_json::to_string_pretty(result).context("failed to render result")?);
    if result.is_valid() {
        println!("OK: proof is valid (offline check)");
        Ok(0)
    } else {
        let codes: Vec<&str> = result.failures.iter().map(|f| f.code()).collect();
        println!("FAIL: {}", codes.join(", "));
        Ok(1)
    }
}
