//! Admission Gates
//!
//! Four pure validators. Each returns an immutable verdict with diagnostics;
//! none of them raise on an ordinary failure.
//!
//! - Gate 1: scope alignment of (phase, policy area, signal type)
//! - Gate 2: value-add threshold on empirical availability
//! - Gate 3: capability subset check against the consumer registry
//! - Gate 4: post-dispatch irrigation audit

mod capability;
mod irrigation;
mod scope;
mod value_add;

pub use capability::{CapabilityGate, CapabilityResult};
pub use irrigation::{IrrigationChannelGate, IrrigationChannelResult};
pub use scope::{ScopeAlignmentGate, ScopeAlignmentResult, ScopeViolation};
pub use value_add::{ValueAddGate, ValueAddResult, DEFAULT_VALUE_THRESHOLD};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a gate in the admission protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GateId {
    #[serde(rename = "gate_1")]
    ScopeAlignment,
    #[serde(rename = "gate_2")]
    ValueAdd,
    #[serde(rename = "gate_3")]
    Capability,
    #[serde(rename = "gate_4")]
    IrrigationChannel,
}

impl GateId {
    /// Gates run before dispatch, in order.
    pub const PRE_DISPATCH: [GateId; 3] =
        [GateId::ScopeAlignment, GateId::ValueAdd, GateId::Capability];

    pub const ALL: [GateId; 4] = [
        GateId::ScopeAlignment,
        GateId::ValueAdd,
        GateId::Capability,
        GateId::IrrigationChannel,
    ];

    /// 1-based position, as reported in `failed_gate_index`.
    pub fn index(&self) -> u8 {
        match self {
            GateId::ScopeAlignment => 1,
            GateId::ValueAdd => 2,
            GateId::Capability => 3,
            GateId::IrrigationChannel => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GateId::ScopeAlignment => "gate_1",
            GateId::ValueAdd => "gate_2",
            GateId::Capability => "gate_3",
            GateId::IrrigationChannel => "gate_4",
        }
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GateId::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("unknown gate: {}", s))
    }
}

/// Verdict of any one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum GateResult {
    ScopeAlignment(ScopeAlignmentResult),
    ValueAdd(ValueAddResult),
    Capability(CapabilityResult),
    IrrigationChannel(IrrigationChannelResult),
}

impl GateResult {
    pub fn gate_id(&self) -> GateId {
        match self {
            GateResult::ScopeAlignment(_) => GateId::ScopeAlignment,
            GateResult::ValueAdd(_) => GateId::ValueAdd,
            GateResult::Capability(_) => GateId::Capability,
            GateResult::IrrigationChannel(_) => GateId::IrrigationChannel,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            GateResult::ScopeAlignment(r) => r.is_valid,
            GateResult::ValueAdd(r) => r.is_valid,
            GateResult::Capability(r) => r.is_valid,
            GateResult::IrrigationChannel(r) => r.is_valid,
        }
    }

    pub fn message(&self) -> String {
        match self {
            GateResult::ScopeAlignment(r) => r.message(),
            GateResult::ValueAdd(r) => r.message.clone(),
            GateResult::Capability(r) => r.message(),
            GateResult::IrrigationChannel(r) => r.message.clone(),
        }
    }
}

impl From<ScopeAlignmentResult> for GateResult {
    fn from(r: ScopeAlignmentResult) -> Self {
        GateResult::ScopeAlignment(r)
    }
}

impl From<ValueAddResult> for GateResult {
    fn from(r: ValueAddResult) -> Self {
        GateResult::ValueAdd(r)
    }
}

impl From<CapabilityResult> for GateResult {
    fn from(r: CapabilityResult) -> Self {
        GateResult::Capability(r)
    }
}

impl From<IrrigationChannelResult> for GateResult {
    fn from(r: IrrigationChannelResult) -> Self {
        GateResult::IrrigationChannel(r)
    }
}
