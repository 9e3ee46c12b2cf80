mod analysis;
mod config;
mod engine;
mod manager;
mod model;
mod render;
mod stats;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// Directory containing `config.toml` and the runs.
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a new simulation until it converges.
    Create {
        /// Seed overriding `run.seed` from the config.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Compute observables of every run.
    Analyze,

    /// Remove every run.
    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.sim_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Create { seed } => mgr.create_run(seed)?,
        Command::Analyze => mgr.analyze_sim()?,
        Command::Clean => mgr.clean_sim()?,
    }

    Ok(())
}
