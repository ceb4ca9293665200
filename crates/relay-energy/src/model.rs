//! Per-agent battery model.

use serde::{Deserialize, Serialize};

use relay_core::EnergyConfig;

/// Edge-triggered energy notifications.
///
/// Each event fires once per crossing, never on every tick spent in a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyEvent {
    /// Level dropped to or below the low threshold.
    BecameLow {
        /// Level after the drop.
        level: u32,
    },
    /// Level reached capacity while charging.
    FullyCharged,
}

/// Integer battery level clamped to `[0, capacity]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyModel {
    config: EnergyConfig,
    level: u32,
    low_reported: bool,
}

impl EnergyModel {
    /// Creates a fully charged battery.
    #[must_use]
    pub const fn new(config: EnergyConfig) -> Self {
        Self {
            level: config.capacity,
            config,
            low_reported: false,
        }
    }

    /// Creates a battery at `level`, clamped to capacity.
    #[must_use]
    pub fn with_level(config: EnergyConfig, level: u32) -> Self {
        let level = level.min(config.capacity);
        Self {
            low_reported: level <= config.low_threshold,
            config,
            level,
        }
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Full charge.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.config.capacity
    }

    /// Level as a fraction of capacity.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        f64::from(self.level) / f64::from(self.config.capacity)
    }

    /// True at capacity.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.level >= self.config.capacity
    }

    /// True at or below the low threshold.
    #[must_use]
    pub const fn needs_charging(&self) -> bool {
        self.level <= self.config.low_threshold
    }

    /// True at or above the task threshold.
    #[must_use]
    pub const fn has_sufficient_energy_for_task(&self) -> bool {
        self.level >= self.config.task_threshold
    }

    /// Energy spent per move.
    #[must_use]
    pub const fn move_cost(&self) -> u32 {
        self.config.move_cost
    }

    /// Spends `amount`, saturating at zero.
    pub fn consume(&mut self, amount: u32) -> Option<EnergyEvent> {
        self.level = self.level.saturating_sub(amount);
        if self.needs_charging() && !self.low_reported {
            self.low_reported = true;
            return Some(EnergyEvent::BecameLow { level: self.level });
        }
        None
    }

    /// Spends the cost of one move.
    pub fn consume_move(&mut self) -> Option<EnergyEvent> {
        self.consume(self.config.move_cost)
    }

    /// Adds one charging step, saturating at capacity.
    pub fn charge(&mut self) -> Option<EnergyEvent> {
        if self.is_full() {
            return None;
        }
        self.level = self
            .level
            .saturating_add(self.config.charging_rate)
            .min(self.config.capacity);
        if !self.needs_charging() {
            self.low_reported = false;
        }
        self.is_full().then_some(EnergyEvent::FullyCharged)
    }
}
