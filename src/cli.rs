//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "groundwork",
    version,
    about = "Plans convergence of a declared AWS topology, idempotently"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load and validate a configuration file without touching any resources.
    Validate {
        /// Path to the TOML configuration.
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
    },
    /// Rehearse one convergence pass against the in-process cloud and report
    /// every action the run would take.
    Simulate {
        /// Path to the TOML configuration.
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
        /// Apply updates that normally require confirmation without prompting.
        #[arg(long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_simulate_flags_parse() {
        let cli = Cli::try_parse_from([
            "groundwork",
            "simulate",
            "--config",
            "groundwork.toml",
            "--yes",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Simulate { yes: true, .. }));
    }

    #[test]
    fn test_validate_requires_config() {
        assert!(Cli::try_parse_from(["groundwork", "validate"]).is_err());
    }
}
