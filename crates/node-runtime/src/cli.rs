//! Command-line interface: flags and the `keygen` subcommand.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quantum-Chain node.
#[derive(Parser, Debug)]
#[command(name = "qc-node")]
#[command(about = "Permissioned consensus-and-sharding node")]
pub struct Cli {
    /// Path to the node's YAML configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Override the consensus algorithm from the config file.
    #[arg(long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Override the config's data directory.
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Log verbosity (`error`, `warn`, `info`, `debug`, `trace`).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI-facing mirror of [`shared_types::config::ConsensusAlgorithm`], kept
/// distinct so `clap`'s derive doesn't need that crate's serde attributes.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum AlgorithmArg {
    /// Proof-of-Work.
    Pow,
    /// Proof-of-Stake.
    Pos,
    /// PBFT.
    Pbft,
    /// LSCC.
    Lscc,
}

impl From<AlgorithmArg> for shared_types::config::ConsensusAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Pow => shared_types::config::ConsensusAlgorithm::Pow,
            AlgorithmArg::Pos => shared_types::config::ConsensusAlgorithm::Pos,
            AlgorithmArg::Pbft => shared_types::config::ConsensusAlgorithm::Pbft,
            AlgorithmArg::Lscc => shared_types::config::ConsensusAlgorithm::Lscc,
        }
    }
}

/// Subcommands beyond running the node.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a new Ed25519 keypair and print its address and hex-encoded
    /// public/private key material to stdout. Wallet/private-key storage
    /// beyond this is out of scope; callers persist the output themselves.
    Keygen,
}
