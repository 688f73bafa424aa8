//! Configuration
//!
//! Defaults, optionally overlaid by a YAML file, then by `SIGNAL_IRRIGATION_*`
//! environment variables.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::expansion::ExpansionThresholds;
use crate::gates::DEFAULT_VALUE_THRESHOLD;

const ENV_PREFIX: &str = "SIGNAL_IRRIGATION_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    pub min_multiplier: f64,
    pub target_multiplier: f64,
    /// Multiplier at which the target counts as "approached".
    pub approach_multiplier: f64,
    pub logging_enabled: bool,
    pub synonym_delimiter: char,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        let thresholds = ExpansionThresholds::default();
        Self {
            min_multiplier: thresholds.min_multiplier,
            target_multiplier: thresholds.target_multiplier,
            approach_multiplier: thresholds.approach_multiplier,
            logging_enabled: true,
            synonym_delimiter: '|',
        }
    }
}

impl ExpansionConfig {
    pub fn thresholds(&self) -> ExpansionThresholds {
        ExpansionThresholds {
            min_multiplier: self.min_multiplier,
            target_multiplier: self.target_multiplier,
            approach_multiplier: self.approach_multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrrigationConfig {
    /// Gate 2 pass threshold, in [0, 1].
    pub value_threshold: f64,
    /// Snapshots are checkpointed here when set.
    pub checkpoint_dir: Option<PathBuf>,
    pub expansion: ExpansionConfig,
}

impl Default for IrrigationConfig {
    fn default() -> Self {
        Self {
            value_threshold: DEFAULT_VALUE_THRESHOLD,
            checkpoint_dir: None,
            expansion: ExpansionConfig::default(),
        }
    }
}

impl IrrigationConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Optional YAML file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_parse::<f64>("VALUE_THRESHOLD")? {
            self.value_threshold = v;
        }
        if let Some(dir) = env_var("CHECKPOINT_DIR") {
            self.checkpoint_dir = if dir.is_empty() {
                None
            } else {
                Some(PathBuf::from(dir))
            };
        }
        if let Some(v) = env_parse::<f64>("MIN_MULTIPLIER")? {
            self.expansion.min_multiplier = v;
        }
        if let Some(v) = env_parse::<f64>("TARGET_MULTIPLIER")? {
            self.expansion.target_multiplier = v;
        }
        if let Some(v) = env_parse::<f64>("APPROACH_MULTIPLIER")? {
            self.expansion.approach_multiplier = v;
        }
        if let Some(v) = env_var("EXPANSION_LOGGING") {
            self.expansion.logging_enabled = matches!(v.as_str(), "1" | "true" | "yes" | "on");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.value_threshold) {
            bail!("value_threshold must be within [0, 1], got {}", self.value_threshold);
        }
        let e = &self.expansion;
        if e.min_multiplier < 1.0 {
            bail!("min_multiplier must be at least 1.0, got {}", e.min_multiplier);
        }
        if e.target_multiplier < e.min_multiplier {
            bail!(
                "target_multiplier ({}) must not be below min_multiplier ({})",
                e.target_multiplier,
                e.min_multiplier
            );
        }
        if e.approach_multiplier < e.min_multiplier || e.approach_multiplier > e.target_multiplier {
            bail!(
                "approach_multiplier ({}) must lie within [min_multiplier ({}), \
                 target_multiplier ({})]",
                e.approach_multiplier,
                e.min_multiplier,
                e.target_multiplier
            );
        }
        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, key)).ok()
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid {}{}={:?}: {}", ENV_PREFIX, key, raw, e)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = IrrigationConfig::default();
        assert_eq!(config.value_threshold, 0.30);
        assert!(config.checkpoint_dir.is_none());
        assert_eq!(config.expansion.min_multiplier, 2.0);
        assert_eq!(config.expansion.target_multiplier, 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("irrigation.yaml");
        fs::write(&path, "value_threshold: 0.5\nexpansion:\n  target_multiplier: 6.0\n").unwrap();

        let config = IrrigationConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.value_threshold, 0.5);
        assert_eq!(config.expansion.target_multiplier, 6.0);
        assert_eq!(config.expansion.min_multiplier, 2.0);
        assert_eq!(config.expansion.synonym_delimiter, '|');
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let config = IrrigationConfig {
            value_threshold: 1.5,
            ..IrrigationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_below_minimum_rejected() {
        let mut config = IrrigationConfig::default();
        config.expansion.target_multiplier = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_minimum_above_approach_rejected() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("irrigation.yaml");
        fs::write(&path, "expansion:\n  min_multiplier: 4.5\n").unwrap();
        assert!(IrrigationConfig::from_yaml_file(&path).is_err());

        fs::write(
            &path,
            "expansion:\n  min_multiplier: 4.5\n  approach_multiplier: 4.8\n",
        )
        .unwrap();
        let config = IrrigationConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.expansion.thresholds().approach_multiplier, 4.8);
    }

    #[test]
    fn test_approach_above_target_rejected() {
        let mut config = IrrigationConfig::default();
        config.expansion.approach_multiplier = 5.5;
        assert!(config.validate().is_err());
    }
}
