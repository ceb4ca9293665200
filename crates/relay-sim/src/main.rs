//! `relay-sim` binary entrypoint.

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use relay_sim::cli::{Cli, Commands};
use relay_sim::commands::{InitConfigCommand, RunCommand};

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relay_sim=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Run(args) => {
            let report = RunCommand::new(args)
                .execute(&mut stdout)
                .context("simulation failed")?;
            if !report.completed {
                return Ok(ExitCode::from(2));
            }
        }
        Commands::InitConfig(args) => {
            InitConfigCommand::new(args)
                .execute(&mut stdout)
                .context("could not write configuration")?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
