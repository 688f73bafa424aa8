//! Gate Orchestrator
//!
//! Composes the four gates into the two-phase admission protocol:
//!
//! - **Pre-dispatch**: gates 1 -> 2 -> 3, fail-fast. Every run produces an
//!   immutable `GateExecutionSnapshot` that is appended to the in-memory
//!   history and, when a checkpoint directory is configured, written to disk.
//! - **Post-dispatch**: gates 1-3 are re-evaluated from scratch, then gate 4
//!   audits the dispatcher's routing. Unreached gates are left empty.
//!
//! Metrics and history share one coarse lock. Checkpoint bytes are encoded
//! before the lock is taken and written after it is released.

mod checkpoint;
mod metrics;
mod snapshot;

pub use checkpoint::CheckpointStore;
pub use metrics::GateMetrics;
pub use snapshot::GateExecutionSnapshot;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::IrrigationConfig;
use crate::error::GateError;
use crate::gates::{
    CapabilityGate, CapabilityResult, GateId, GateResult, IrrigationChannelGate,
    IrrigationChannelResult, ScopeAlignmentGate, ScopeAlignmentResult, ValueAddGate,
    ValueAddResult,
};
use crate::signal::{AuditEntry, ConsumerCapabilityMap, Signal};

/// Result of a pre-dispatch validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreDispatchOutcome {
    pub success: bool,
    /// 1-based index of the gate that stopped validation.
    pub failed_gate_index: Option<u8>,
    /// Verdict of the last gate that ran.
    pub last_result: GateResult,
    pub snapshot: GateExecutionSnapshot,
}

/// Result of a post-dispatch re-validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDispatchReport {
    pub all_passed: bool,
    pub gate_1: Option<ScopeAlignmentResult>,
    pub gate_2: Option<ValueAddResult>,
    pub gate_3: Option<CapabilityResult>,
    pub gate_4: Option<IrrigationChannelResult>,
    pub failed_at_gate: Option<GateId>,
}

/// Typed trace of gates 1-3 for one signal.
struct PreDispatchTrace {
    gate_1: ScopeAlignmentResult,
    gate_2: Option<ValueAddResult>,
    gate_3: Option<CapabilityResult>,
    failed_at: Option<GateId>,
}

impl PreDispatchTrace {
    fn results(&self) -> Vec<GateResult> {
        let mut results: Vec<GateResult> = vec![self.gate_1.clone().into()];
        if let Some(r) = &self.gate_2 {
            results.push(r.clone().into());
        }
        if let Some(r) = &self.gate_3 {
            results.push(r.clone().into());
        }
        results
    }

    fn last_result(&self) -> GateResult {
        match (&self.gate_2, &self.gate_3) {
            (_, Some(r)) => r.clone().into(),
            (Some(r), None) => r.clone().into(),
            (None, None) => self.gate_1.clone().into(),
        }
    }

    fn observations(&self) -> Vec<(GateId, bool)> {
        let mut obs = vec![(GateId::ScopeAlignment, self.gate_1.is_valid)];
        if let Some(r) = &self.gate_2 {
            obs.push((GateId::ValueAdd, r.is_valid));
        }
        if let Some(r) = &self.gate_3 {
            obs.push((GateId::Capability, r.is_valid));
        }
        obs
    }

    fn passed_gates(&self) -> BTreeSet<GateId> {
        self.observations()
            .into_iter()
            .filter(|(_, passed)| *passed)
            .map(|(gate, _)| gate)
            .collect()
    }
}

#[derive(Default)]
struct OrchestratorState {
    metrics: GateMetrics,
    history: Vec<GateExecutionSnapshot>,
}

pub struct GateOrchestrator {
    scope_gate: ScopeAlignmentGate,
    value_gate: ValueAddGate,
    capability_gate: CapabilityGate,
    irrigation_gate: IrrigationChannelGate,
    checkpoints: Option<CheckpointStore>,
    state: Mutex<OrchestratorState>,
}

impl GateOrchestrator {
    pub fn new() -> Self {
        Self {
            scope_gate: ScopeAlignmentGate::new(),
            value_gate: ValueAddGate::default(),
            capability_gate: CapabilityGate::new(),
            irrigation_gate: IrrigationChannelGate::new(),
            checkpoints: None,
            state: Mutex::new(OrchestratorState::default()),
        }
    }

    pub fn from_config(config: &IrrigationConfig) -> Self {
        let orchestrator = Self::new().with_value_threshold(config.value_threshold);
        match &config.checkpoint_dir {
            Some(dir) => orchestrator.with_checkpoint_dir(dir.clone()),
            None => orchestrator,
        }
    }

    pub fn with_value_threshold(mut self, threshold: f64) -> Self {
        self.value_gate = ValueAddGate::new(threshold);
        self
    }

    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoints = Some(CheckpointStore::new(dir));
        self
    }

    pub fn checkpoint_store(&self) -> Option<&CheckpointStore> {
        self.checkpoints.as_ref()
    }

    fn state(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gates 1 -> 2 -> 3, stopping at the first failure.
    fn run_pre_dispatch_gates(
        &self,
        signal: &Signal,
        consumers: &ConsumerCapabilityMap,
    ) -> PreDispatchTrace {
        let gate_1 = self
            .scope_gate
            .validate(&signal.phase, &signal.policy_area, &signal.signal_type);
        if !gate_1.is_valid {
            return PreDispatchTrace {
                gate_1,
                gate_2: None,
                gate_3: None,
                failed_at: Some(GateId::ScopeAlignment),
            };
        }

        let gate_2 = self
            .value_gate
            .validate(signal.empirical_availability, signal.is_enrichment);
        if !gate_2.is_valid {
            return PreDispatchTrace {
                gate_1,
                gate_2: Some(gate_2),
                gate_3: None,
                failed_at: Some(GateId::ValueAdd),
            };
        }

        let available = self.capability_gate.available_capabilities(consumers);
        let gate_3 = self.capability_gate.validate(&signal.required_capabilities, &available);
        let failed_at = if gate_3.is_valid {
            None
        } else {
            Some(GateId::Capability)
        };

        PreDispatchTrace {
            gate_1,
            gate_2: Some(gate_2),
            gate_3: Some(gate_3),
            failed_at,
        }
    }

    fn record_metrics(&self, observations: &[(GateId, bool)], latency: Duration) {
        self.state().metrics.record(observations, latency);
    }

    /// Run the pre-dispatch protocol for one signal.
    ///
    /// Gate failure is reported in the outcome, never as an error. A fresh
    /// UUID is used when no execution id is supplied.
    pub fn validate_pre_dispatch(
        &self,
        signal: &Signal,
        consumers: &ConsumerCapabilityMap,
        execution_id: Option<&str>,
    ) -> PreDispatchOutcome {
        let started = Instant::now();
        let execution_id = execution_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let span = info_span!("pre_dispatch", signal_id = %signal.id, execution_id = %execution_id);
        let _enter = span.enter();

        let trace = self.run_pre_dispatch_gates(signal, consumers);
        let latency = started.elapsed();

        let snapshot = GateExecutionSnapshot {
            execution_id: execution_id.clone(),
            signal_id: signal.id.clone(),
            gate_sequence: GateId::PRE_DISPATCH.to_vec(),
            passed_gates: trace.passed_gates(),
            failed_at: trace.failed_at,
            results: trace.results(),
            timestamp: Utc::now(),
        };

        let encoded = match &self.checkpoints {
            Some(_) => match CheckpointStore::encode(&snapshot) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("Snapshot {} not checkpointed: {}", execution_id, e);
                    None
                }
            },
            None => None,
        };

        {
            let mut state = self.state();
            state.metrics.record(&trace.observations(), latency);
            state.history.push(snapshot.clone());
        }

        if let (Some(store), Some(bytes)) = (&self.checkpoints, encoded) {
            if let Err(e) = store.write(&execution_id, &bytes) {
                warn!("Checkpoint write failed for {}: {}", execution_id, e);
            }
        }

        match trace.failed_at {
            Some(gate) => warn!(
                "Signal {} stopped at {}: {}",
                signal.id,
                gate,
                trace.last_result().message()
            ),
            None => info!("Signal {} cleared pre-dispatch gates", signal.id),
        }

        PreDispatchOutcome {
            success: trace.failed_at.is_none(),
            failed_gate_index: trace.failed_at.map(|g| g.index()),
            last_result: trace.last_result(),
            snapshot,
        }
    }

    /// Re-validate gates 1-3 after dispatch, then audit the routing with gate 4.
    ///
    /// Without a consumer map the available capability set is empty.
    pub fn validate_post_dispatch(
        &self,
        signal: &Signal,
        audit_entries: &[AuditEntry],
        consumers: Option<&ConsumerCapabilityMap>,
    ) -> PostDispatchReport {
        let started = Instant::now();
        let span = info_span!("post_dispatch", signal_id = %signal.id);
        let _enter = span.enter();

        let empty = ConsumerCapabilityMap::new();
        let trace = self.run_pre_dispatch_gates(signal, consumers.unwrap_or(&empty));
        let mut observations = trace.observations();

        let gate_4 = if trace.failed_at.is_none() {
            let result = self.irrigation_gate.validate_post_dispatch(
                &signal.id,
                signal.routed,
                &signal.consumers,
                audit_entries,
            );
            observations.push((GateId::IrrigationChannel, result.is_valid));
            Some(result)
        } else {
            None
        };

        let failed_at_gate = match (&trace.failed_at, &gate_4) {
            (Some(gate), _) => Some(*gate),
            (None, Some(r)) if !r.is_valid => Some(GateId::IrrigationChannel),
            _ => None,
        };

        self.record_metrics(&observations, started.elapsed());

        match failed_at_gate {
            Some(gate) => warn!("Signal {} failed post-dispatch at {}", signal.id, gate),
            None => info!("Signal {} passed post-dispatch validation", signal.id),
        }

        PostDispatchReport {
            all_passed: failed_at_gate.is_none(),
            gate_1: Some(trace.gate_1),
            gate_2: trace.gate_2,
            gate_3: trace.gate_3,
            gate_4,
            failed_at_gate,
        }
    }

    /// Check whether `target_gate` is a valid rollback point for a run.
    ///
    /// This is a query: nothing is restored here. `Ok(false)` means the gate
    /// was part of the run but never passed.
    pub fn rollback_to_gate(
        &self,
        execution_id: &str,
        target_gate: &str,
    ) -> Result<bool, GateError> {
        let snapshot = self
            .get_snapshot_by_id(execution_id)
            .ok_or_else(|| GateError::UnknownExecution(execution_id.to_string()))?;

        let gate: GateId = target_gate
            .parse()
            .map_err(|_| GateError::InvalidTargetGate(target_gate.to_string()))?;

        if !snapshot.gate_sequence.contains(&gate) {
            return Err(GateError::GateNotInSequence {
                execution_id: execution_id.to_string(),
                gate: target_gate.to_string(),
            });
        }

        let valid = snapshot.passed_gates.contains(&gate);
        debug!("Rollback of {} to {}: {}", execution_id, gate, valid);
        Ok(valid)
    }

    pub fn get_execution_history(&self) -> Vec<GateExecutionSnapshot> {
        self.state().history.clone()
    }

    /// Most recent in-memory snapshot for the id, else the stored checkpoint.
    pub fn get_snapshot_by_id(&self, execution_id: &str) -> Option<GateExecutionSnapshot> {
        let in_memory = self
            .state()
            .history
            .iter()
            .rev()
            .find(|s| s.execution_id == execution_id)
            .cloned();
        if in_memory.is_some() {
            return in_memory;
        }

        let store = self.checkpoints.as_ref()?;
        match store.load(execution_id) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Could not load checkpoint {}: {}", execution_id, e);
                None
            }
        }
    }

    /// Drop the in-memory history. Checkpoints on disk are untouched.
    pub fn clear_execution_history(&self) -> usize {
        let mut state = self.state();
        let count = state.history.len();
        state.history.clear();
        info!("Cleared {} execution snapshots", count);
        count
    }

    pub fn get_metrics(&self) -> GateMetrics {
        self.state().metrics.clone()
    }

    pub fn reset_metrics(&self) {
        self.state().metrics = GateMetrics::new();
    }
}

impl Default for GateOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}
