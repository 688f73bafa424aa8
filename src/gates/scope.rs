//! Gate 1: Scope Alignment
//!
//! Checks a (phase, policy area, signal type) triple against the static
//! alignment tables in `crate::signal`. All three checks run; every
//! violation is reported.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::signal::{Phase, PolicyArea};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeViolation {
    InvalidPhase,
    InvalidPolicyArea,
    SignalTypePhaseMismatch,
}

impl ScopeViolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeViolation::InvalidPhase => "INVALID_PHASE",
            ScopeViolation::InvalidPolicyArea => "INVALID_POLICY_AREA",
            ScopeViolation::SignalTypePhaseMismatch => "SIGNAL_TYPE_PHASE_MISMATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeAlignmentResult {
    pub is_valid: bool,
    pub errors: Vec<ScopeViolation>,
    pub phase: String,
    pub policy_area: String,
    pub signal_type: String,
}

impl ScopeAlignmentResult {
    pub fn message(&self) -> String {
        if self.is_valid {
            "Scope aligned".to_string()
        } else {
            let codes: Vec<&str> = self.errors.iter().map(|e| e.as_str()).collect();
            format!("Scope misaligned: {}", codes.join(", "))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeAlignmentGate;

impl ScopeAlignmentGate {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(
        &self,
        phase: &str,
        policy_area: &str,
        signal_type: &str,
    ) -> ScopeAlignmentResult {
        let mut errors = Vec::new();

        let parsed_phase = phase.parse::<Phase>().ok();
        if parsed_phase.is_none() {
            errors.push(ScopeViolation::InvalidPhase);
        }

        if policy_area.parse::<PolicyArea>().is_err() {
            errors.push(ScopeViolation::InvalidPolicyArea);
        }

        // The type table is only meaningful for a known phase.
        if let Some(p) = parsed_phase {
            if !p.allows(signal_type) {
                errors.push(ScopeViolation::SignalTypePhaseMismatch);
            }
        }

        debug!(phase, policy_area, signal_type, violations = errors.len(), "gate_1 evaluated");

        ScopeAlignmentResult {
            is_valid: errors.is_empty(),
            errors,
            phase: phase.to_string(),
            policy_area: policy_area.to_string(),
            signal_type: signal_type.to_string(),
        }
    }
}
