//! `run` command implementation.

use std::io::Write;

use tracing::info;

use relay_core::FleetConfig;

use crate::cli::RunArgs;
use crate::error::SimError;
use crate::output::write_report;
use crate::simulation::{ClockMode, Simulation, SimulationReport};

/// Run command executor.
#[derive(Debug, Clone)]
pub struct RunCommand {
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    #[must_use]
    pub const fn new(args: RunArgs) -> Self {
        Self { args }
    }

    /// Loads the configuration and applies flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn config(&self) -> Result<FleetConfig, SimError> {
        let mut config = match &self.args.config {
            Some(path) => FleetConfig::from_file(path)?,
            None => FleetConfig::default(),
        };
        let simulation = &mut config.simulation;
        if let Some(agents) = self.args.agents {
            simulation.agents = agents;
        }
        if let Some(packages) = self.args.packages {
            simulation.packages = packages;
            simulation.initial_packages = simulation.initial_packages.min(packages);
        }
        if let Some(seed) = self.args.seed {
            simulation.seed = seed;
        }
        if let Some(max_ticks) = self.args.max_ticks {
            simulation.max_ticks = max_ticks;
        }
        Ok(config)
    }

    /// Runs the simulation without printing.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn simulate(&self) -> Result<SimulationReport, SimError> {
        let config = self.config()?;
        let mode = if self.args.realtime {
            ClockMode::Realtime
        } else {
            ClockMode::Stepped
        };
        info!(
            agents = config.simulation.agents,
            packages = config.simulation.packages,
            seed = config.simulation.seed,
            realtime = self.args.realtime,
            "starting simulation"
        );
        let mut simulation = Simulation::new(config, mode)?;
        Ok(simulation.run())
    }

    /// Execute the run command.
    ///
    /// # Errors
    ///
    /// Returns an error if the simulation cannot start or output fails.
    pub fn execute<W: Write>(&self, writer: &mut W) -> Result<SimulationReport, SimError> {
        let report = self.simulate()?;
        write_report(writer, &report, self.args.json)?;
        Ok(report)
    }
}
