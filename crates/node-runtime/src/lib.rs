//! # Node Runtime
//!
//! The node executable's library half: [`cli::Cli`] (flag/subcommand
//! parsing), [`config::NodeConfig`] (YAML loading and validation), and
//! [`wiring::Node`] (subsystem construction and the run loop). `main.rs`
//! is a thin `anyhow`-aggregating shell over these.

pub mod cli;
pub mod config;
pub mod wiring;

pub use cli::Cli;
pub use config::NodeConfig;
pub use wiring::Node;
