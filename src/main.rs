//! # Groundwork entry point
//!
//! Loads the declared configuration, wires the cloud boundary, and runs a
//! single convergence pass. Risky environment updates prompt on the terminal
//! unless `--yes` is passed.
//!
//! `simulate` runs against the in-process cloud: a transport-free rehearsal
//! of the plan, reporting every action a run would take. Real transports
//! plug in through `CloudClients` without touching anything here.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod cli;
mod confirm;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use groundwork_cloud::InMemoryCloud;
use groundwork_core::spec::DesiredSpec;
use groundwork_reconciler::{ApproveAll, Confirm, ConvergenceDriver};

use cli::{Cli, Command};
use confirm::TerminalConfirm;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Validate { config } => {
            let spec = DesiredSpec::from_toml_path(&config)
                .with_context(|| format!("failed to load '{}'", config.display()))?;
            spec.validate().context("configuration is invalid")?;
            info!(
                app = %spec.app_name,
                environment = %spec.environment,
                "configuration valid"
            );
        }
        Command::Simulate { config, yes } => {
            let spec = DesiredSpec::from_toml_path(&config)
                .with_context(|| format!("failed to load '{}'", config.display()))?;

            let confirm: Arc<dyn Confirm> = if yes {
                Arc::new(ApproveAll)
            } else {
                Arc::new(TerminalConfirm)
            };

            let cloud = InMemoryCloud::new_arc();
            let driver = ConvergenceDriver::new(cloud.clients(), confirm);
            let summary = driver
                .run(&spec)
                .await
                .context("convergence run failed")?;

            println!("{}", summary.render());
            if summary.warnings().count() > 0 {
                warn!("run completed with unresolved divergence; see the summary above");
            }
        }
    }

    Ok(())
}

/// Tracing subscriber with environment filter; `info` by default.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
