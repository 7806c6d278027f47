use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use reguwatch::config::Config;
use reguwatch::console;
use reguwatch::orchestrator::Orchestrator;
use reguwatch::types::{Regulator, DEFAULT_SELECTION};

#[derive(Debug, Parser)]
#[command(name = "reguwatch", about = "Canadian regulatory update watch and template compliance audit")]
struct Args {
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Search for recent updates from the selected regulators
    Fetch {
        /// Regulator code (repeatable). Defaults to FSRA, CIRO and CSA
        #[arg(long = "regulator", short = 'r')]
        regulators: Vec<Regulator>,

        /// Write the resulting updates as JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Audit a document template against known updates
    Audit {
        /// Path to a plain-text template
        #[arg(long)]
        template: PathBuf,

        /// Regulator code (repeatable), used with --fetch-first
        #[arg(long = "regulator", short = 'r')]
        regulators: Vec<Regulator>,

        /// Refresh the update feed before auditing
        #[arg(long, default_value_t = false)]
        fetch_first: bool,

        /// Write the verdict as JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the tracked regulators
    Regulators,
    /// Interactive dashboard (default)
    Console,
}

fn selection(regulators: Vec<Regulator>) -> BTreeSet<Regulator> {
    if regulators.is_empty() {
        DEFAULT_SELECTION.into_iter().collect()
    } else {
        regulators.into_iter().collect()
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // logging
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter_layer).init();

    let command = args.command.unwrap_or(Cmd::Console);
    if let Cmd::Regulators = command {
        console::display_regulators(&DEFAULT_SELECTION.into_iter().collect());
        return Ok(());
    }

    tracing::info!("Starting ReguWatch");
    let cfg = Config::load()?;
    let orchestrator = Orchestrator::new(cfg)?;

    match command {
        Cmd::Fetch { regulators, out } => {
            orchestrator.run_fetch(selection(regulators), out.as_deref()).await?;
        }
        Cmd::Audit { template, regulators, fetch_first, out } => {
            orchestrator
                .run_audit(&template, selection(regulators), fetch_first, out.as_deref())
                .await?;
        }
        Cmd::Console => orchestrator.run_console().await?,
        Cmd::Regulators => {}
    }
    Ok(())
}
