//! Record of completed deliveries.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::{AgentName, DestinationId, PackageId};
use crate::world::Package;

/// One completed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Delivered package.
    pub package: PackageId,
    /// Goal it was delivered to.
    pub destination: DestinationId,
    /// Agent that completed the delivery.
    pub agent: AgentName,
    /// Wall-clock time of delivery.
    pub delivered_at: DateTime<Utc>,
}

/// Append-only delivery log shared by all agents.
///
/// Its length is the global delivered counter.
#[derive(Debug, Default)]
pub struct DeliveryLedger {
    records: Mutex<Vec<DeliveryRecord>>,
}

impl DeliveryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a delivery and returns the new total.
    pub fn record(&self, agent: &AgentName, package: &Package) -> usize {
        let mut records = self.records.lock();
        records.push(DeliveryRecord {
            package: package.id(),
            destination: package.destination(),
            agent: agent.clone(),
            delivered_at: Utc::now(),
        });
        records.len()
    }

    /// Number of deliveries so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.lock().len()
    }

    /// True when `package` has been delivered.
    #[must_use]
    pub fn contains(&self, package: PackageId) -> bool {
        self.records.lock().iter().any(|r| r.package == package)
    }

    /// Snapshot of all records.
    #[must_use]
    pub fn records(&self) -> Vec<DeliveryRecord> {
        self.records.lock().clone()
    }
}
