use std::error::Error;
use std::fs;
use std::path::Path;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{
    history::{self, HistoryArgs},
    run::{self, RunArgs},
};

mod commands;
mod harness;

#[derive(Parser, Debug)]
#[command(name = "repex-sim", about = "Replica-exchange cycle coordinator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute an exchange run from a YAML configuration with the in-process
    /// harness standing in for the remote resource.
    Run(RunArgs),
    /// Report recorded exchange history from a run directory as CSV.
    History(HistoryArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::History(args) => history::run(&args),
    }
}

fn write_json<P: AsRef<Path>, T: serde::Serialize>(path: P, value: &T) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
