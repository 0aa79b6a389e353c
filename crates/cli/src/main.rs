//! Fingerprint CLI - fp command

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

mod cmd;
mod report;
mod work;

/// Fingerprint the declared inputs of a unit of work
#[derive(Parser)]
#[command(name = "fp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint every input of a work file
    Fingerprint {
        /// Work file (TOML)
        work: PathBuf,
        /// Write a JSON report of all fingerprints
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Check whether a work file's inputs changed since a report
    Check {
        /// Work file (TOML)
        work: PathBuf,
        /// Report written by `fp fingerprint --report`
        #[arg(long)]
        against: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fingerprint { work, report } => {
            cmd::fingerprint::run(&work, report.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { work, against } => {
            if cmd::check::run(&work, &against)? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
