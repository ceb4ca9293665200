//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Relay fleet simulator.
#[derive(Parser, Debug, Clone)]
#[command(name = "relay-sim")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one simulation and print its report.
    Run(RunArgs),

    /// Print the default configuration.
    InitConfig(InitConfigArgs),
}

/// Arguments for `run`.
///
/// Flags override the `simulation` section of the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// JSON configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "RELAY_FLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of agents.
    #[arg(short, long)]
    pub agents: Option<usize>,

    /// Number of packages.
    #[arg(short, long)]
    pub packages: Option<usize>,

    /// RNG seed for placement and packages.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Upper bound on work ticks.
    #[arg(long)]
    pub max_ticks: Option<u64>,

    /// Pace ticks with the wall clock instead of a stepped clock.
    #[arg(long)]
    pub realtime: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `init-config`.
#[derive(Args, Debug, Clone, Default)]
pub struct InitConfigArgs {
    /// Write to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["relay-sim", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            unreachable!("expected run");
        };
        assert!(args.agents.is_none());
        assert!(!args.realtime);
        assert!(!args.json);
    }

    #[test]
    fn run_overrides() {
        let cli = Cli::try_parse_from([
            "relay-sim",
            "run",
            "--agents",
            "7",
            "--packages",
            "12",
            "--seed",
            "3",
            "--max-ticks",
            "100",
            "--realtime",
            "--json",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            unreachable!("expected run");
        };
        assert_eq!(args.agents, Some(7));
        assert_eq!(args.packages, Some(12));
        assert_eq!(args.seed, Some(3));
        assert_eq!(args.max_ticks, Some(100));
        assert!(args.realtime);
        assert!(args.json);
    }

    #[test]
    fn init_config_parses() {
        let cli = Cli::try_parse_from(["relay-sim", "init-config", "--output", "fleet.json"]).unwrap();
        let Commands::InitConfig(args) = cli.command else {
            unreachable!("expected init-config");
        };
        assert_eq!(args.output, Some(PathBuf::from("fleet.json")));
        assert!(!args.force);
    }

    #[test]
    fn unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["relay-sim", "deploy"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
