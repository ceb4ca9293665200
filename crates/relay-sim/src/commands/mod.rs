//! CLI command implementations.
//!
//! - [`run`] - Run a simulation and report the outcome
//! - [`init`] - Emit the default configuration

pub mod init;
pub mod run;

pub use init::InitConfigCommand;
pub use run::RunCommand;
