//! # Keygen Subcommand
//!
//! Writes an Ed25519 key pair as two hex files: `<prefix>.key` (32-byte
//! seed) and `<prefix>.pub` (32-byte public key).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use dsov_crypto::Ed25519KeyPair;

/// Arguments for `dsov keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for the key files.
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,
    /// Prefix for the key filenames.
    #[arg(long, default_value = "dsov")]
    pub prefix: String,
}

pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    cmd_keygen(&args.output, &args.prefix)
}

fn cmd_keygen(output_dir: &Path, prefix: &str) -> Result<u8> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory: {}", output_dir.display()))?;

    let keypair = Ed25519KeyPair::generate();
    let seed_hex = keypair.to_seed_hex();
    let pub_hex = keypair.public_key().to_hex();

    let key_path = output_dir.join(format!("{prefix}.key"));
    let pub_path = output_dir.join(format!("{prefix}.pub"));

    std::fs::write(&key_path, seed_hex.as_bytes())
        .with_context(|| format!("failed to write private key: {}", key_path.display()))?;
    std::fs::write(&pub_path, &pub_hex)
        .with_context(|| format!("failed to write public key: {}", pub_path.display()))?;

    tracing::info!(public_key = %pub_hex, "generated Ed25519 key pair");
    println!("OK: generated Ed25519 keypair");
    println!("  Private key: {}", key_path.display());
    println!("  Public key:  {}", pub_path.display());
    println!("  Public key (hex): {pub_hex}");

    Ok(0)
}
