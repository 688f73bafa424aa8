//! Gate 4: Irrigation Channel
//!
//! Post-dispatch audit. A routed signal must have reached at least one
//! consumer and left at least one audit entry behind.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::signal::AuditEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationChannelResult {
    pub is_valid: bool,
    pub signal_id: String,
    pub consumer_count: usize,
    pub has_audit: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IrrigationChannelGate;

impl IrrigationChannelGate {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_post_dispatch(
        &self,
        signal_id: &str,
        routed: bool,
        consumers: &[String],
        audit_entries: &[AuditEntry],
    ) -> IrrigationChannelResult {
        let consumer_count = consumers.len();
        let has_audit = !audit_entries.is_empty();

        let (is_valid, message) = if !routed {
            (true, "Not routed".to_string())
        } else if consumer_count == 0 {
            (false, format!("Signal {} routed but no consumers found", signal_id))
        } else if !has_audit {
            (false, format!("Signal {} routed but no audit trail", signal_id))
        } else {
            (true, "Dispatch successful".to_string())
        };

        debug!(signal_id, routed, consumer_count, has_audit, is_valid, "gate_4 evaluated");

        IrrigationChannelResult {
            is_valid,
            signal_id: signal_id.to_string(),
            consumer_count,
            has_audit,
            message,
        }
    }
}
