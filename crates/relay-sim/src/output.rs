//! Report rendering for the `run` command.

use std::io::Write;

use relay_core::Role;

use crate::error::SimError;
use crate::simulation::SimulationReport;

/// Writes `report` as pretty JSON or as a human-readable table.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_report<W: Write>(writer: &mut W, report: &SimulationReport, json: bool) -> Result<(), SimError> {
    if json {
        serde_json::to_writer_pretty(&mut *writer, report)
            .map_err(|e| SimError::Format(format!("JSON serialization failed: {e}")))?;
        writeln!(writer)?;
        return Ok(());
    }
    write_table(writer, report)
}

fn role_label(role: Option<Role>) -> String {
    role.map_or_else(|| "-".to_string(), |r| r.to_string())
}

fn write_table<W: Write>(writer: &mut W, report: &SimulationReport) -> Result<(), SimError> {
    writeln!(writer, "Simulation Report")?;
    writeln!(writer, "══════════════════════════════════")?;
    writeln!(writer, "Seed:             {}", report.seed)?;
    writeln!(
        writer,
        "Outcome:          {}",
        if report.completed { "completed" } else { "tick budget exhausted" }
    )?;
    writeln!(writer, "Negotiation:      {} ticks", report.negotiation_ticks)?;
    writeln!(writer, "Work:             {} ticks", report.ticks)?;
    writeln!(writer)?;
    writeln!(writer, "Packages")?;
    writeln!(writer, "  Requested:      {}", report.packages)?;
    writeln!(writer, "  Produced:       {}", report.produced)?;
    writeln!(writer, "  Delivered:      {}", report.delivered)?;
    writeln!(writer, "  Abandoned:      {}", report.abandoned)?;
    writeln!(writer)?;
    writeln!(writer, "Coordinator")?;
    writeln!(writer, "  Completed:      {}", report.coordinator.completed_tasks)?;
    writeln!(writer, "  Pending:        {}", report.coordinator.pending_tasks)?;
    writeln!(writer, "  Assigned:       {}", report.coordinator.assigned_tasks)?;
    writeln!(
        writer,
        "  Avg delivery:   {:.2}s",
        report.coordinator.average_delivery_secs
    )?;
    writeln!(
        writer,
        "  Avg energy:     {:.1}",
        report.coordinator.average_energy_used
    )?;
    writeln!(writer)?;

    writeln!(
        writer,
        "{:<10} {:<6} {:<16} {:<9} {:>6} {:>10} {:>9}",
        "AGENT", "ROLE", "STATE", "POSITION", "ENERGY", "DELIVERIES", "ABANDONED"
    )?;
    for agent in &report.agents {
        writeln!(
            writer,
            "{:<10} {:<6} {:<16} {:<9} {:>6} {:>10} {:>9}",
            agent.name.as_str(),
            role_label(agent.role),
            agent.state.to_string(),
            agent.position.to_string(),
            agent.energy,
            agent.deliveries,
            agent.abandoned
        )?;
    }
    Ok(())
}
