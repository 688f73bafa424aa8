//! Signal Model
//!
//! Routing-intent records produced upstream and the static alignment tables
//! the scope gate checks them against.
//!
//! Phase, policy area and signal type travel as raw tags on the wire. They are
//! only parsed into `Phase`/`PolicyArea` inside the gates, so a malformed tag
//! surfaces as a gate violation instead of a deserialization failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Consumer id -> capability tags. Owned by an external registry, read-only here.
pub type ConsumerCapabilityMap = BTreeMap<String, BTreeSet<String>>;

/// The ten pipeline stages a signal can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "phase_0")]
    Phase0,
    #[serde(rename = "phase_1")]
    Phase1,
    #[serde(rename = "phase_2")]
    Phase2,
    #[serde(rename = "phase_3")]
    Phase3,
    #[serde(rename = "phase_4")]
    Phase4,
    #[serde(rename = "phase_5")]
    Phase5,
    #[serde(rename = "phase_6")]
    Phase6,
    #[serde(rename = "phase_7")]
    Phase7,
    #[serde(rename = "phase_8")]
    Phase8,
    #[serde(rename = "phase_9")]
    Phase9,
}

impl Phase {
    pub const ALL: [Phase; 10] = [
        Phase::Phase0,
        Phase::Phase1,
        Phase::Phase2,
        Phase::Phase3,
        Phase::Phase4,
        Phase::Phase5,
        Phase::Phase6,
        Phase::Phase7,
        Phase::Phase8,
        Phase::Phase9,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Phase0 => "phase_0",
            Phase::Phase1 => "phase_1",
            Phase::Phase2 => "phase_2",
            Phase::Phase3 => "phase_3",
            Phase::Phase4 => "phase_4",
            Phase::Phase5 => "phase_5",
            Phase::Phase6 => "phase_6",
            Phase::Phase7 => "phase_7",
            Phase::Phase8 => "phase_8",
            Phase::Phase9 => "phase_9",
        }
    }

    /// Signal types a phase is allowed to emit.
    pub fn allowed_signal_types(&self) -> &'static [&'static str] {
        match self {
            Phase::Phase0 => &["DOCUMENT_MANIFEST", "INPUT_VALIDATION"],
            Phase::Phase1 => &["STRUCTURAL_PARSE", "CHUNK_READY"],
            Phase::Phase2 => &["PATTERN_MATCH", "EVIDENCE_EXTRACTION", "MICRO_ANSWER"],
            Phase::Phase3 => &["MICRO_SCORE", "EVIDENCE_EXTRACTION"],
            Phase::Phase4 => &["DIMENSION_SCORE", "AGGREGATION_READY"],
            Phase::Phase5 => &["AREA_SCORE", "MESO_SCORE"],
            Phase::Phase6 => &["CLUSTER_SCORE", "MESO_SCORE"],
            Phase::Phase7 => &["MACRO_SCORE"],
            Phase::Phase8 => &["RECOMMENDATION"],
            Phase::Phase9 => &["REPORT_READY", "AUDIT_COMPLETE"],
        }
    }

    pub fn allows(&self, signal_type: &str) -> bool {
        self.allowed_signal_types().contains(&signal_type)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown phase: {}", s))
    }
}

/// Policy areas PA01..PA10 plus the two umbrella scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyArea {
    #[serde(rename = "PA01")]
    Pa01,
    #[serde(rename = "PA02")]
    Pa02,
    #[serde(rename = "PA03")]
    Pa03,
    #[serde(rename = "PA04")]
    Pa04,
    #[serde(rename = "PA05")]
    Pa05,
    #[serde(rename = "PA06")]
    Pa06,
    #[serde(rename = "PA07")]
    Pa07,
    #[serde(rename = "PA08")]
    Pa08,
    #[serde(rename = "PA09")]
    Pa09,
    #[serde(rename = "PA10")]
    Pa10,
    All,
    CrossCutting,
}

impl PolicyArea {
    pub const ALL_AREAS: [PolicyArea; 12] = [
        PolicyArea::Pa01,
        PolicyArea::Pa02,
        PolicyArea::Pa03,
        PolicyArea::Pa04,
        PolicyArea::Pa05,
        PolicyArea::Pa06,
        PolicyArea::Pa07,
        PolicyArea::Pa08,
        PolicyArea::Pa09,
        PolicyArea::Pa10,
        PolicyArea::All,
        PolicyArea::CrossCutting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyArea::Pa01 => "PA01",
            PolicyArea::Pa02 => "PA02",
            PolicyArea::Pa03 => "PA03",
            PolicyArea::Pa04 => "PA04",
            PolicyArea::Pa05 => "PA05",
            PolicyArea::Pa06 => "PA06",
            PolicyArea::Pa07 => "PA07",
            PolicyArea::Pa08 => "PA08",
            PolicyArea::Pa09 => "PA09",
            PolicyArea::Pa10 => "PA10",
            PolicyArea::All => "ALL",
            PolicyArea::CrossCutting => "CROSS_CUTTING",
        }
    }
}

impl fmt::Display for PolicyArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyArea {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PolicyArea::ALL_AREAS
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown policy area: {}", s))
    }
}

/// A unit of evidence-seeking routing intent.
///
/// `routed` and `consumers` are written by the external dispatcher between
/// pre- and post-dispatch validation; nothing in this crate mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub phase: String,
    pub policy_area: String,
    pub signal_type: String,
    #[serde(default)]
    pub required_capabilities: BTreeSet<String>,
    #[serde(default)]
    pub empirical_availability: f64,
    #[serde(default)]
    pub is_enrichment: bool,
    #[serde(default)]
    pub routed: bool,
    #[serde(default)]
    pub consumers: Vec<String>,
}

impl Signal {
    pub fn new(
        id: impl Into<String>,
        phase: impl Into<String>,
        policy_area: impl Into<String>,
        signal_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            phase: phase.into(),
            policy_area: policy_area.into(),
            signal_type: signal_type.into(),
            required_capabilities: BTreeSet::new(),
            empirical_availability: 0.0,
            is_enrichment: false,
            routed: false,
            consumers: Vec::new(),
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.insert(capability.into());
        self
    }

    pub fn with_availability(mut self, availability: f64) -> Self {
        self.empirical_availability = availability;
        self
    }

    pub fn with_enrichment(mut self, is_enrichment: bool) -> Self {
        self.is_enrichment = is_enrichment;
        self
    }

    /// Record the dispatcher's routing decision.
    pub fn routed_to(mut self, consumers: Vec<String>) -> Self {
        self.routed = true;
        self.consumers = consumers;
        self
    }
}

/// One line of the dispatcher's audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub signal_id: String,
    #[serde(default)]
    pub consumer_id: Option<String>,
    #[serde(default)]
    pub event: String,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn delivered(signal_id: impl Into<String>, consumer_id: impl Into<String>) -> Self {
        Self {
            signal_id: signal_id.into(),
            consumer_id: Some(consumer_id.into()),
            event: "delivered".to_string(),
            recorded_at: Utc::now(),
        }
    }
}
