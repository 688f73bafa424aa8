//! Error Types
//!
//! Caller-misuse and I/O errors. Gate verdicts are never errors: a failing
//! gate is an ordinary result value carried by the orchestrator outcome.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the gate orchestrator and its checkpoint store.
#[derive(Debug, Error)]
pub enum GateError {
    /// No snapshot was recorded for this execution id.
    #[error("unknown execution id: {0}")]
    UnknownExecution(String),

    /// The gate name does not parse as `gate_1`..`gate_4`.
    #[error("invalid target gate: {0:?}")]
    InvalidTargetGate(String),

    /// The gate exists but was not part of the recorded run.
    #[error("gate {gate} is not in the gate sequence of execution {execution_id}")]
    GateNotInSequence { execution_id: String, gate: String },

    /// Execution ids double as checkpoint file names.
    #[error("execution id {0:?} cannot be used as a checkpoint key")]
    InvalidExecutionId(String),

    #[error("checkpoint I/O failed at {path}: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the semantic pattern expander.
#[derive(Debug, Error)]
pub enum ExpansionError {
    /// Batch expansion only accepts a JSON array.
    #[error("expected a sequence of pattern records, found {found}")]
    NotASequence { found: &'static str },

    #[error("pattern {pattern_id:?} has an unusable semantic_expansion payload: {reason}")]
    InvalidSemanticExpansion { pattern_id: String, reason: String },

    #[error("pattern record at index {index} is malformed: {source}")]
    MalformedRecord {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}
