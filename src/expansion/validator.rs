//! Expansion Validator
//!
//! Checks that a batch met its coverage multipliers and that variant
//! metadata hangs together. Only shrinkage and a missed minimum invalidate a
//! batch; structural mismatches are reported as warnings.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::{ExpansionThresholds, PatternSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionValidation {
    pub valid: bool,
    pub multiplier: f64,
    pub meets_minimum: bool,
    pub meets_target: bool,
    pub original_count: usize,
    pub expanded_count: usize,
    /// `expanded_count - original_count`, may be negative.
    pub variant_count: i64,
    /// Records actually tagged `is_variant`.
    pub tagged_variant_count: usize,
    pub base_count: usize,
    /// Ids of variants whose `variant_of` matches no base record.
    pub orphaned_variants: Vec<String>,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub thresholds: ExpansionThresholds,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpansionValidator {
    thresholds: ExpansionThresholds,
}

impl ExpansionValidator {
    pub fn new(thresholds: ExpansionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn validate(
        &self,
        original: &[PatternSpec],
        expanded: &[PatternSpec],
    ) -> ExpansionValidation {
        let original_count = original.len();
        let expanded_count = expanded.len();
        let variant_count = expanded_count as i64 - original_count as i64;
        let t = self.thresholds;

        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        if original_count == 0 {
            issues.push("No patterns to expand".to_string());
            return ExpansionValidation {
                valid: false,
                multiplier: 0.0,
                meets_minimum: false,
                meets_target: false,
                original_count,
                expanded_count,
                variant_count,
                tagged_variant_count: expanded.iter().filter(|p| p.is_variant).count(),
                base_count: expanded.iter().filter(|p| !p.is_variant).count(),
                orphaned_variants: Vec::new(),
                issues,
                warnings,
                thresholds: t,
            };
        }

        let multiplier = expanded_count as f64 / original_count as f64;
        let meets_minimum = multiplier >= t.min_multiplier;
        let meets_target = multiplier >= t.target_multiplier;

        if expanded_count < original_count {
            issues.push(format!(
                "Expansion lost patterns: {} original, {} after expansion",
                original_count, expanded_count
            ));
        }
        if !meets_minimum {
            issues.push(format!(
                "Multiplier {:.2}x below minimum {:.1}x",
                multiplier, t.min_multiplier
            ));
        } else if !meets_target {
            warnings.push(format!(
                "Multiplier {:.2}x meets minimum but misses target {:.1}x",
                multiplier, t.target_multiplier
            ));
        }

        let (variants, bases): (Vec<&PatternSpec>, Vec<&PatternSpec>) =
            expanded.iter().partition(|p| p.is_variant);

        if variants.len() as i64 != variant_count {
            warnings.push(format!(
                "Tagged variant count {} differs from expected {}",
                variants.len(),
                variant_count
            ));
        }
        if bases.len() != original_count {
            warnings.push(format!(
                "Base record count {} differs from original count {}",
                bases.len(),
                original_count
            ));
        }

        let base_ids: HashSet<&str> = bases.iter().map(|p| p.id.as_str()).collect();
        let orphaned_variants: Vec<String> = variants
            .iter()
            .filter(|v| !v.variant_of.as_deref().is_some_and(|parent| base_ids.contains(parent)))
            .map(|v| v.id.clone())
            .collect();
        if !orphaned_variants.is_empty() {
            warnings.push(format!(
                "{} orphaned variants: {}",
                orphaned_variants.len(),
                orphaned_variants.join(", ")
            ));
        }

        let valid = meets_minimum && issues.is_empty();
        if valid {
            debug!("Expansion valid at {:.2}x", multiplier);
        } else {
            warn!("Expansion invalid: {}", issues.join("; "));
        }

        ExpansionValidation {
            valid,
            multiplier,
            meets_minimum,
            meets_target,
            original_count,
            expanded_count,
            variant_count,
            tagged_variant_count: variants.len(),
            base_count: bases.len(),
            orphaned_variants,
            issues,
            warnings,
            thresholds: t,
        }
    }
}

/// Validate with explicit minimum and target multipliers.
pub fn validate_expansion_result(
    original: &[PatternSpec],
    expanded: &[PatternSpec],
    min_multiplier: f64,
    target_multiplier: f64,
) -> ExpansionValidation {
    let thresholds = ExpansionThresholds {
        min_multiplier,
        target_multiplier,
        ..ExpansionThresholds::default()
    };
    ExpansionValidator::new(thresholds).validate(original, expanded)
}
