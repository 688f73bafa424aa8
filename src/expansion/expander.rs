//! Semantic Pattern Expander
//!
//! Generates variants of a pattern by substituting its core term with each
//! candidate synonym. A narrow Spanish agreement fix pluralizes a fixed set
//! of adjectives that directly follow a plural synonym; nothing beyond that
//! list is touched.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{extract_core_term, ExpansionThresholds, PatternSpec};
use crate::config::ExpansionConfig;
use crate::error::ExpansionError;

/// Singular adjectives that follow the synonym and must agree with it.
const AGREEMENT_ADJECTIVES: [&str; 4] = ["asignado", "destinado", "disponible", "público"];

/// Which band a batch multiplier falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    BelowMinimum,
    MinimumAchieved,
    TargetApproached,
    TargetAchieved,
}

impl PerformanceTier {
    /// The minimum is checked first, so a batch below it is never reported
    /// as approaching the target whatever the approach threshold says.
    pub fn classify(multiplier: f64, thresholds: &ExpansionThresholds) -> Self {
        if multiplier < thresholds.min_multiplier {
            PerformanceTier::BelowMinimum
        } else if multiplier >= thresholds.target_multiplier {
            PerformanceTier::TargetAchieved
        } else if multiplier >= thresholds.approach_multiplier {
            PerformanceTier::TargetApproached
        } else {
            PerformanceTier::MinimumAchieved
        }
    }
}

/// Aggregate figures for one batch. Not persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpansionStatistics {
    pub original_count: usize,
    pub variant_count: usize,
    pub total_count: usize,
    pub failed_count: usize,
    pub multiplier: f64,
    pub min_variants_per_pattern: usize,
    pub max_variants_per_pattern: usize,
    pub avg_variants_per_pattern: f64,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionBatch<T = PatternSpec> {
    pub patterns: Vec<T>,
    pub statistics: ExpansionStatistics,
}

/// Running counters while a batch is processed.
struct BatchTally {
    started: Instant,
    original_count: usize,
    failed_count: usize,
    per_pattern: Vec<usize>,
}

impl BatchTally {
    fn new(original_count: usize) -> Self {
        Self {
            started: Instant::now(),
            original_count,
            failed_count: 0,
            per_pattern: Vec::with_capacity(original_count),
        }
    }

    fn finish(self, total_count: usize) -> ExpansionStatistics {
        let variant_count: usize = self.per_pattern.iter().sum();
        let multiplier = if self.original_count == 0 {
            0.0
        } else {
            total_count as f64 / self.original_count as f64
        };
        let avg = if self.per_pattern.is_empty() {
            0.0
        } else {
            variant_count as f64 / self.per_pattern.len() as f64
        };

        ExpansionStatistics {
            original_count: self.original_count,
            variant_count,
            total_count,
            failed_count: self.failed_count,
            multiplier,
            min_variants_per_pattern: self.per_pattern.iter().copied().min().unwrap_or(0),
            max_variants_per_pattern: self.per_pattern.iter().copied().max().unwrap_or(0),
            avg_variants_per_pattern: avg,
            duration_ms: self.started.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SemanticPatternExpander {
    delimiter: char,
    thresholds: ExpansionThresholds,
}

impl SemanticPatternExpander {
    pub fn new() -> Self {
        Self {
            delimiter: '|',
            thresholds: ExpansionThresholds::default(),
        }
    }

    pub fn from_config(config: &ExpansionConfig) -> Self {
        Self {
            delimiter: config.synonym_delimiter,
            thresholds: config.thresholds(),
        }
    }

    pub fn thresholds(&self) -> &ExpansionThresholds {
        &self.thresholds
    }

    /// Expand one pattern. The first element is always the original.
    ///
    /// Patterns without a synonym payload, without a pattern string or
    /// without an extractable core term come back alone.
    pub fn expand_pattern_semantically(
        &self,
        spec: &PatternSpec,
    ) -> Result<Vec<PatternSpec>, ExpansionError> {
        let mut original = spec.clone();
        original.is_variant = false;
        original.variant_of = None;
        let mut expanded = vec![original];

        let Some(payload) = &spec.semantic_expansion else {
            debug!("Pattern {} has no semantic_expansion, skipping", spec.id);
            return Ok(expanded);
        };
        if spec.pattern.is_empty() {
            debug!("Pattern {} has no base pattern, skipping", spec.id);
            return Ok(expanded);
        }
        let Some(core_term) = extract_core_term(&spec.pattern) else {
            debug!("No core term in pattern {} ({:?}), skipping", spec.id, spec.pattern);
            return Ok(expanded);
        };

        let candidates = payload
            .candidates(self.delimiter)
            .map_err(|reason| ExpansionError::InvalidSemanticExpansion {
                pattern_id: spec.id.clone(),
                reason,
            })?;

        let core_lower = core_term.to_lowercase();
        let mut counter = 0;
        for synonym in candidates {
            if synonym.to_lowercase() == core_lower {
                continue;
            }

            let substituted = spec.pattern.replace(&core_term, &synonym);
            let corrected = apply_agreement(&substituted, &synonym).map_err(|e| {
                ExpansionError::InvalidSemanticExpansion {
                    pattern_id: spec.id.clone(),
                    reason: format!("agreement rule for {:?} failed: {}", synonym, e),
                }
            })?;

            counter += 1;
            let mut variant = spec.clone();
            variant.id = format!("{}-V{}", spec.id, counter);
            variant.pattern = corrected;
            variant.is_variant = true;
            variant.variant_of = Some(spec.id.clone());
            variant.synonym_used = Some(synonym);
            expanded.push(variant);
        }

        debug!("Pattern {} expanded on {:?} into {} variants", spec.id, core_term, counter);
        Ok(expanded)
    }

    /// Expand a typed batch. A pattern that fails to expand is passed through
    /// unexpanded and counted as a failure.
    pub fn expand_all(&self, patterns: &[PatternSpec], logging_enabled: bool) -> ExpansionBatch {
        let mut tally = BatchTally::new(patterns.len());
        let mut out = Vec::with_capacity(patterns.len());

        for spec in patterns {
            match self.expand_pattern_semantically(spec) {
                Ok(expanded) => {
                    tally.per_pattern.push(expanded.len() - 1);
                    out.extend(expanded);
                }
                Err(e) => {
                    warn!("Pattern {} passed through unexpanded: {}", spec.id, e);
                    tally.failed_count += 1;
                    out.push(spec.clone());
                }
            }
        }

        let statistics = tally.finish(out.len());
        if logging_enabled {
            self.log_statistics(&statistics);
        }
        ExpansionBatch {
            patterns: out,
            statistics,
        }
    }

    /// Expand an untyped JSON batch.
    ///
    /// The input must be an array. Non-object entries are counted as failures
    /// and skipped; object entries that fail to parse or expand are kept as-is.
    pub fn expand_all_patterns(
        &self,
        patterns: &Value,
        logging_enabled: bool,
    ) -> Result<ExpansionBatch<Value>, ExpansionError> {
        let items = patterns.as_array().ok_or(ExpansionError::NotASequence {
            found: json_kind(patterns),
        })?;

        let mut tally = BatchTally::new(items.len());
        let mut out = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            if !item.is_object() {
                warn!("Entry {} is a {}, not a pattern record; skipped", index, json_kind(item));
                tally.failed_count += 1;
                continue;
            }

            match self.expand_value(index, item) {
                Ok(expanded) => {
                    tally.per_pattern.push(expanded.len() - 1);
                    out.extend(expanded);
                }
                Err(e) => {
                    warn!("Entry {} passed through unexpanded: {}", index, e);
                    tally.failed_count += 1;
                    out.push(item.clone());
                }
            }
        }

        let statistics = tally.finish(out.len());
        if logging_enabled {
            self.log_statistics(&statistics);
        }
        Ok(ExpansionBatch {
            patterns: out,
            statistics,
        })
    }

    fn expand_value(&self, index: usize, item: &Value) -> Result<Vec<Value>, ExpansionError> {
        let spec: PatternSpec = serde_json::from_value(item.clone())
            .map_err(|source| ExpansionError::MalformedRecord { index, source })?;
        self.expand_pattern_semantically(&spec)?
            .iter()
            .map(|p| {
                serde_json::to_value(p)
                    .map_err(|source| ExpansionError::MalformedRecord { index, source })
            })
            .collect()
    }

    fn log_statistics(&self, stats: &ExpansionStatistics) {
        info!(
            "Expanded {} patterns into {} ({} variants, {} failed) in {:.1}ms; multiplier {:.2}x",
            stats.original_count,
            stats.total_count,
            stats.variant_count,
            stats.failed_count,
            stats.duration_ms,
            stats.multiplier
        );
        info!(
            "Variants per pattern: min {}, max {}, avg {:.2}",
            stats.min_variants_per_pattern,
            stats.max_variants_per_pattern,
            stats.avg_variants_per_pattern
        );

        let t = &self.thresholds;
        match PerformanceTier::classify(stats.multiplier, t) {
            PerformanceTier::BelowMinimum => warn!(
                "Expansion multiplier {:.2}x is below the {:.1}x minimum",
                stats.multiplier, t.min_multiplier
            ),
            PerformanceTier::MinimumAchieved => info!(
                "Expansion multiplier {:.2}x meets the {:.1}x minimum",
                stats.multiplier, t.min_multiplier
            ),
            PerformanceTier::TargetApproached => info!(
                "Expansion multiplier {:.2}x is approaching the {:.1}x target",
                stats.multiplier, t.target_multiplier
            ),
            PerformanceTier::TargetAchieved => info!(
                "Expansion multiplier {:.2}x reaches the {:.1}x target",
                stats.multiplier, t.target_multiplier
            ),
        }
    }
}

impl Default for SemanticPatternExpander {
    fn default() -> Self {
        Self::new()
    }
}

/// Pluralize a listed adjective directly after a plural synonym.
/// Synonyms ending in "ss" are not treated as plural.
fn apply_agreement(pattern: &str, synonym: &str) -> Result<String, regex::Error> {
    let lower = synonym.to_lowercase();
    if !lower.ends_with('s') || lower.ends_with("ss") {
        return Ok(pattern.to_string());
    }

    let rule = Regex::new(&format!(
        r"(?i)({}\s+)({})\b",
        regex::escape(synonym),
        AGREEMENT_ADJECTIVES.join("|")
    ))?;
    Ok(rule.replace_all(pattern, "${1}${2}s").into_owned())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
