//! # dsov CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dsov_cli::keygen::{run_keygen, KeygenArgs};
use dsov_cli::proof::{run_proof, ProofArgs};
use dsov_cli::sync::{run_sync, SyncArgs};

/// DataSov bridge operator tooling.
///
/// Generates provider keys, checks proofs offline, and runs the
/// synchronizer against fixture-seeded in-memory ledgers.
#[derive(Parser, Debug)]
#[command(name = "dsov", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 key pair as hex files.
    Keygen(KeygenArgs),

    /// Proof operations.
    Proof(ProofArgs),

    /// Seed in-memory ledgers from a fixture and run the synchronizer.
    Sync(SyncArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Proof(args) => run_proof(&args),
        Commands::Sync(args) => run_sync(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use dsov_cli::proof::{ProofCommand, ProofKind};

    #[test]
    fn parse_keygen() {
        let cli = Cli::try_parse_from(["dsov", "keygen", "--output", "/tmp/keys", "--prefix", "kyc"]).unwrap();
        match cli.command {
            Commands::Keygen(args) => {
                assert_eq!(args.output, PathBuf::from("/tmp/keys"));
                assert_eq!(args.prefix, "kyc");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_keygen_defaults() {
        let cli = Cli::try_parse_from(["dsov", "keygen"]).unwrap();
        if let Commands::Keygen(args) = cli.command {
            assert_eq!(args.output, PathBuf::from("."));
            assert_eq!(args.prefix, "dsov");
        }
    }

    #[test]
    fn parse_proof_verify_access() {
        let cli = Cli::try_parse_from([
            "dsov", "proof", "verify", "--pubkey", "k.pub", "proof.json", "--kind", "access",
        ])
        .unwrap();
        let Commands::Proof(args) = cli.command else {
            panic!("expected proof command");
        };
        let ProofCommand::Verify { pubkey, file, kind } = args.command;
        assert_eq!(pubkey, PathBuf::from("k.pub"));
        assert_eq!(file, PathBuf::from("proof.json"));
        assert_eq!(kind, ProofKind::Access);
    }

    #[test]
    fn proof_kind_defaults_to_identity() {
        let cli = Cli::try_parse_from(["dsov", "proof", "verify", "--pubkey", "k.pub", "p.json"]).unwrap();
        if let Commands::Proof(args) = cli.command {
            let ProofCommand::Verify { kind, .. } = args.command;
            assert_eq!(kind, ProofKind::Identity);
        }
    }

    #[test]
    fn parse_sync_once_with_verbosity() {
        let cli = Cli::try_parse_from(["dsov", "-vv", "sync", "--fixture", "ids.json", "--once"]).unwrap();
        assert_eq!(cli.verbose, 2);
        if let Commands::Sync(args) = cli.command {
            assert_eq!(args.fixture, PathBuf::from("ids.json"));
            assert!(args.once);
        }
    }

    #[test]
    fn sync_requires_fixture() {
        assert!(Cli::try_parse_from(["dsov", "sync"]).is_err());
    }
}
