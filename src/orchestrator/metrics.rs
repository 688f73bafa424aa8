//! Gate Metrics
//!
//! Aggregate pass rates and latency across every orchestrated call. The
//! orchestrator owns one instance behind its state lock; readers get a copy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::gates::GateId;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GateMetrics {
    pub total_executions: u64,
    /// Exponential moving average of each gate's pass observations.
    pub gate_pass_rates: BTreeMap<GateId, f64>,
    /// Running arithmetic mean over all calls, in milliseconds.
    pub average_latency_ms: f64,
}

impl GateMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one orchestrated call into the aggregate.
    ///
    /// `alpha = 2 / (n + 1)` with `n` the execution count after this call.
    /// Only gates that actually ran contribute an observation.
    pub fn record(&mut self, observations: &[(GateId, bool)], latency: Duration) {
        self.total_executions += 1;
        let n = self.total_executions as f64;
        let alpha = 2.0 / (n + 1.0);

        for (gate, passed) in observations {
            let observation = if *passed { 1.0 } else { 0.0 };
            let rate = self.gate_pass_rates.entry(*gate).or_insert(0.0);
            *rate = alpha * observation + (1.0 - alpha) * *rate;
        }

        let latency_ms = latency.as_secs_f64() * 1000.0;
        self.average_latency_ms += (latency_ms - self.average_latency_ms) / n;
    }

    pub fn pass_rate(&self, gate: GateId) -> Option<f64> {
        self.gate_pass_rates.get(&gate).copied()
    }
}
