//! Quantum-Chain node entry point.

use anyhow::{Context, Result};
use clap::Parser;
use node_runtime::cli::Command;
use node_runtime::{Cli, Node, NodeConfig};
use shared_crypto::Keypair;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Some(Command::Keygen) = cli.command {
        let keypair = Keypair::generate();
        println!("address:     {}", keypair.address());
        println!("public_key:  {}", hex::encode(keypair.public_key()));
        println!("secret_key:  {}", hex::encode(keypair.secret_bytes()));
        return Ok(());
    }

    let mut config = NodeConfig::load(&cli.config).with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(algorithm) = cli.algorithm {
        config.consensus.algorithm = algorithm.into();
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let local_keypair = Arc::new(Keypair::generate());
    tracing::info!(address = %local_keypair.address(), "starting node");

    let node = Node::build(&config, local_keypair).context("wiring subsystems")?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(());
    });

    node.run(shutdown_rx).await;
    Ok(())
}
