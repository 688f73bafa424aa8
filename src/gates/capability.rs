//! Gate 3: Capability
//!
//! Required capabilities must be a subset of what the registered consumers
//! can offer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::signal::ConsumerCapabilityMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityResult {
    pub is_valid: bool,
    /// `required - available`
    pub missing: BTreeSet<String>,
}

impl CapabilityResult {
    pub fn message(&self) -> String {
        if self.is_valid {
            "All required capabilities available".to_string()
        } else {
            let missing: Vec<&str> = self.missing.iter().map(String::as_str).collect();
            format!("Missing capabilities: {}", missing.join(", "))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityGate;

impl CapabilityGate {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(
        &self,
        required: &BTreeSet<String>,
        available: &BTreeSet<String>,
    ) -> CapabilityResult {
        let missing: BTreeSet<String> = required.difference(available).cloned().collect();
        debug!(required = required.len(), missing = missing.len(), "gate_3 evaluated");
        CapabilityResult {
            is_valid: missing.is_empty(),
            missing,
        }
    }

    /// Union of every consumer's capability set.
    pub fn available_capabilities(&self, consumers: &ConsumerCapabilityMap) -> BTreeSet<String> {
        consumers.values().flatten().cloned().collect()
    }

    /// Consumers able to serve `required` on their own, in id order.
    pub fn find_eligible_consumers(
        &self,
        required: &BTreeSet<String>,
        consumers: &ConsumerCapabilityMap,
    ) -> Vec<String> {
        consumers
            .iter()
            .filter(|(_, caps)| required.is_subset(caps))
            .map(|(id, _)| id.clone())
            .collect()
    }
}
