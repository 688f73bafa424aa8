use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::gates::{GateId, GateResult};

/// Immutable record of one pre-dispatch run.
///
/// Also the on-disk checkpoint schema, field for field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateExecutionSnapshot {
    pub execution_id: String,
    pub signal_id: String,
    /// Planned gate order for the run, including gates never reached.
    pub gate_sequence: Vec<GateId>,
    pub passed_gates: BTreeSet<GateId>,
    pub failed_at: Option<GateId>,
    pub results: Vec<GateResult>,
    pub timestamp: DateTime<Utc>,
}

impl GateExecutionSnapshot {
    pub fn succeeded(&self) -> bool {
        self.failed_at.is_none()
    }

    pub fn result_for(&self, gate: GateId) -> Option<&GateResult> {
        self.results.iter().find(|r| r.gate_id() == gate)
    }
}
