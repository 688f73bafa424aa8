//! Signal Irrigation
//!
//! Admission control and semantic enrichment for pipeline signals:
//! - Four admission gates (scope, value, capability, irrigation audit)
//! - A fail-fast gate orchestrator with snapshots, checkpoints and metrics
//! - Synonym-driven pattern expansion with coverage validation

pub mod config;
pub mod error;
pub mod expansion;
pub mod gates;
pub mod orchestrator;
pub mod signal;
pub mod utils;

// Re-exports for convenience
pub use config::IrrigationConfig;
pub use error::{ExpansionError, GateError};
pub use expansion::{ExpansionValidator, PatternSpec, SemanticPatternExpander};
pub use gates::{GateId, GateResult};
pub use orchestrator::GateOrchestrator;
pub use signal::{AuditEntry, ConsumerCapabilityMap, Signal};
