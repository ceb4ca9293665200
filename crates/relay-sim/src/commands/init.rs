//! `init-config` command implementation.

use std::fs;
use std::io::Write;

use tracing::info;

use relay_core::FleetConfig;

use crate::cli::InitConfigArgs;
use crate::error::SimError;

/// Writes the default configuration.
#[derive(Debug, Clone)]
pub struct InitConfigCommand {
    args: InitConfigArgs,
}

impl InitConfigCommand {
    /// Create a new init-config command.
    #[must_use]
    pub const fn new(args: InitConfigArgs) -> Self {
        Self { args }
    }

    /// Execute the command, printing to `writer` unless an output file was
    /// given.
    ///
    /// # Errors
    ///
    /// Returns an error if the target exists without `--force`, or writing
    /// fails.
    pub fn execute<W: Write>(&self, writer: &mut W) -> Result<(), SimError> {
        let json = FleetConfig::default().to_json()?;
        match &self.args.output {
            Some(path) => {
                if path.exists() && !self.args.force {
                    return Err(SimError::Io(std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        format!("{} already exists, use --force to overwrite", path.display()),
                    )));
                }
                fs::write(path, format!("{json}\n"))?;
                info!(path = %path.display(), "configuration written");
            }
            None => writeln!(writer, "{json}")?,
        }
        Ok(())
    }
}
