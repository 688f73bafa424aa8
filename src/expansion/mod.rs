//! Semantic Pattern Expansion
//!
//! Multiplies the coverage of text-matching rules before they are applied:
//! the anchor term of each pattern is swapped for domain synonyms, producing
//! variant records that point back at their base pattern.

mod core_term;
mod expander;
mod validator;

pub use core_term::extract_core_term;
pub use expander::{ExpansionBatch, ExpansionStatistics, PerformanceTier, SemanticPatternExpander};
pub use validator::{validate_expansion_result, ExpansionValidation, ExpansionValidator};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Coverage multiplier thresholds for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpansionThresholds {
    pub min_multiplier: f64,
    pub target_multiplier: f64,
    pub approach_multiplier: f64,
}

impl Default for ExpansionThresholds {
    fn default() -> Self {
        Self {
            min_multiplier: 2.0,
            target_multiplier: 5.0,
            approach_multiplier: 4.0,
        }
    }
}

/// Synonym payload: either a delimited string (`"recursos|fondos"`) or a
/// mapping of context key to one synonym or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SemanticExpansion {
    Delimited(String),
    Mapping(Map<String, Value>),
}

impl SemanticExpansion {
    /// Flatten into one ordered candidate list. Mapping keys keep their
    /// encounter order; blanks are dropped.
    pub fn candidates(&self, delimiter: char) -> Result<Vec<String>, String> {
        let mut out = Vec::new();
        match self {
            SemanticExpansion::Delimited(raw) => {
                out.extend(
                    raw.split(delimiter)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                );
            }
            SemanticExpansion::Mapping(map) => {
                for (key, value) in map {
                    match value {
                        Value::String(s) => push_trimmed(&mut out, s),
                        Value::Array(items) => {
                            for item in items {
                                match item {
                                    Value::String(s) => push_trimmed(&mut out, s),
                                    other => {
                                        return Err(format!(
                                            "non-string synonym under {:?}: {}",
                                            key, other
                                        ));
                                    }
                                }
                            }
                        }
                        Value::Null => {}
                        other => {
                            return Err(format!("unsupported synonyms under {:?}: {}", key, other))
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let trimmed = s.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// A text-matching rule. Fields this crate does not know about are kept in
/// `extra` and copied onto every variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_expansion: Option<SemanticExpansion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub is_variant: bool,
    #[serde(default)]
    pub variant_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonym_used: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PatternSpec {
    pub fn new(id: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            semantic_expansion: None,
            confidence_weight: None,
            category: None,
            is_variant: false,
            variant_of: None,
            synonym_used: None,
            extra: Map::new(),
        }
    }

    pub fn with_synonyms(mut self, delimited: impl Into<String>) -> Self {
        self.semantic_expansion = Some(SemanticExpansion::Delimited(delimited.into()));
        self
    }

    pub fn with_confidence(mut self, weight: f64) -> Self {
        self.confidence_weight = Some(weight);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}
