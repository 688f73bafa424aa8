//! Gate 2: Value Add
//!
//! A signal must carry enough empirical availability to be worth routing.

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_VALUE_THRESHOLD: f64 = 0.30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueAddResult {
    pub is_valid: bool,
    pub score: f64,
    pub threshold: f64,
    /// Carried through unchanged; the comparison does not branch on it.
    pub is_enrichment: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ValueAddGate {
    threshold: f64,
}

impl ValueAddGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Clamp the raw indicator into [0, 1]. NaN counts as no value.
    pub fn calculate_value_score(&self, empirical_availability: f64) -> f64 {
        if empirical_availability.is_nan() {
            return 0.0;
        }
        empirical_availability.clamp(0.0, 1.0)
    }

    pub fn validate(&self, empirical_availability: f64, is_enrichment: bool) -> ValueAddResult {
        let score = self.calculate_value_score(empirical_availability);
        let is_valid = score >= self.threshold;

        let message = if is_valid {
            format!("Value score {:.2} meets threshold {:.2}", score, self.threshold)
        } else {
            format!("Value score {:.2} below threshold {:.2}", score, self.threshold)
        };

        debug!(score, threshold = self.threshold, is_enrichment, is_valid, "gate_2 evaluated");

        ValueAddResult {
            is_valid,
            score,
            threshold: self.threshold,
            is_enrichment,
            message,
        }
    }
}

impl Default for ValueAddGate {
    fn default() -> Self {
        Self::new(DEFAULT_VALUE_THRESHOLD)
    }
}
