//! Signal Irrigation CLI
//!
//! Thin command-line front end over the library:
//! - `expand <patterns.json> [--out <file>]`
//! - `validate-signal <signal.json> <consumers.json>`
//! - `post-dispatch <signal.json> <audit.json> [<consumers.json>]`
//!
//! Configuration comes from `SIGNAL_IRRIGATION_CONFIG` (YAML) and
//! `SIGNAL_IRRIGATION_*` overrides; a `.env` file is honoured.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use signal_irrigation::expansion::ExpansionValidator;
use signal_irrigation::gates::CapabilityGate;
use signal_irrigation::utils::telemetry::{init_tracing, DEFAULT_DIRECTIVE};
use signal_irrigation::{
    AuditEntry, ConsumerCapabilityMap, GateOrchestrator, IrrigationConfig, PatternSpec,
    SemanticPatternExpander, Signal,
};

// ──────────────────────────────────────────────────────────────────────────────
// HELPERS
// ──────────────────────────────────────────────────────────────────────────────

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Best-effort typed view of a record, for validation of mixed batches.
fn as_record(value: &Value) -> PatternSpec {
    serde_json::from_value(value.clone()).unwrap_or_else(|_| {
        let mut spec = PatternSpec::new(value["id"].as_str().unwrap_or_default(), "");
        spec.is_variant = value["is_variant"].as_bool().unwrap_or(false);
        spec.variant_of = value["variant_of"].as_str().map(str::to_string);
        spec
    })
}

fn usage() -> &'static str {
    "usage:\n  \
     signal-irrigation expand <patterns.json> [--out <file>]\n  \
     signal-irrigation validate-signal <signal.json> <consumers.json>\n  \
     signal-irrigation post-dispatch <signal.json> <audit.json> [<consumers.json>]"
}

// ──────────────────────────────────────────────────────────────────────────────
// COMMANDS
// ──────────────────────────────────────────────────────────────────────────────

fn run_expand(config: &IrrigationConfig, args: &[String]) -> Result<()> {
    let Some(input) = args.first() else {
        bail!("expand needs a patterns file\n{}", usage());
    };
    let out = match args.get(1).map(String::as_str) {
        Some("--out") => Some(PathBuf::from(args.get(2).context("--out needs a path")?)),
        Some(other) => bail!("unexpected argument {:?}\n{}", other, usage()),
        None => None,
    };

    let patterns: Value = read_json(Path::new(input))?;
    let expander = SemanticPatternExpander::from_config(&config.expansion);
    let batch = expander.expand_all_patterns(&patterns, config.expansion.logging_enabled)?;

    let original: Vec<PatternSpec> = patterns
        .as_array()
        .map(|items| items.iter().filter(|v| v.is_object()).map(as_record).collect())
        .unwrap_or_default();
    let expanded: Vec<PatternSpec> = batch.patterns.iter().map(as_record).collect();
    let validation = ExpansionValidator::new(*expander.thresholds()).validate(&original, &expanded);

    let mut report = json!({
        "statistics": batch.statistics,
        "validation": validation,
    });
    match out {
        Some(path) => {
            fs::write(&path, serde_json::to_vec_pretty(&batch.patterns)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} patterns to {}", batch.patterns.len(), path.display());
        }
        None => report["patterns"] = Value::Array(batch.patterns),
    }
    print_json(&report)
}

fn run_validate_signal(config: &IrrigationConfig, args: &[String]) -> Result<()> {
    let (Some(signal_path), Some(consumers_path)) = (args.first(), args.get(1)) else {
        bail!("validate-signal needs a signal file and a consumers file\n{}", usage());
    };
    let signal: Signal = read_json(Path::new(signal_path))?;
    let consumers: ConsumerCapabilityMap = read_json(Path::new(consumers_path))?;

    let orchestrator = GateOrchestrator::from_config(config);
    let outcome = orchestrator.validate_pre_dispatch(&signal, &consumers, None);
    let eligible =
        CapabilityGate::new().find_eligible_consumers(&signal.required_capabilities, &consumers);

    print_json(&json!({
        "outcome": outcome,
        "eligible_consumers": eligible,
        "metrics": orchestrator.get_metrics(),
    }))
}

fn run_post_dispatch(config: &IrrigationConfig, args: &[String]) -> Result<()> {
    let (Some(signal_path), Some(audit_path)) = (args.first(), args.get(1)) else {
        bail!("post-dispatch needs a signal file and an audit file\n{}", usage());
    };
    let signal: Signal = read_json(Path::new(signal_path))?;
    let audit: Vec<AuditEntry> = read_json(Path::new(audit_path))?;
    let consumers: Option<ConsumerCapabilityMap> = match args.get(2) {
        Some(p) => Some(read_json(Path::new(p))?),
        None => None,
    };

    let orchestrator = GateOrchestrator::from_config(config);
    let report = orchestrator.validate_post_dispatch(&signal, &audit, consumers.as_ref());
    print_json(&serde_json::to_value(report)?)
}

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing(DEFAULT_DIRECTIVE);

    let config_path = env::var("SIGNAL_IRRIGATION_CONFIG").ok().map(PathBuf::from);
    let config = IrrigationConfig::load(config_path.as_deref())?;

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!("{}", usage());
    };

    match command.as_str() {
        "expand" => run_expand(&config, &args[1..]),
        "validate-signal" => run_validate_signal(&config, &args[1..]),
        "post-dispatch" => run_post_dispatch(&config, &args[1..]),
        other => bail!("unknown command {:?}\n{}", other, usage()),
    }
}
