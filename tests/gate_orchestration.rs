use signal_irrigation::gates::{
    GateId, GateResult, ScopeAlignmentGate, ScopeViolation, ValueAddGate,
};
use signal_irrigation::orchestrator::{CheckpointStore, GateOrchestrator};
use signal_irrigation::signal::{AuditEntry, ConsumerCapabilityMap, Signal};
use signal_irrigation::{GateError, IrrigationConfig};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn caps(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn registry() -> ConsumerCapabilityMap {
    let mut map = ConsumerCapabilityMap::new();
    map.insert("extractor".to_string(), caps(&["nlp", "ocr"]));
    map.insert("scorer".to_string(), caps(&["scoring"]));
    map
}

fn admissible_signal(id: &str) -> Signal {
    Signal::new(id, "phase_3", "PA05", "MICRO_SCORE")
        .with_capability("nlp")
        .with_capability("scoring")
        .with_availability(0.75)
}

#[test]
fn test_scope_gate_rejects_meso_score_in_phase_four() {
    let result = ScopeAlignmentGate::new().validate("phase_4", "PA03", "MESO_SCORE");
    assert!(!result.is_valid);
    assert_eq!(result.errors, vec![ScopeViolation::SignalTypePhaseMismatch]);
}

#[test]
fn test_value_gate_rejects_low_availability() {
    let result = ValueAddGate::default().validate(0.25, false);
    assert_eq!(result.score, 0.25);
    assert!(!result.is_valid);
}

#[test]
fn test_pre_dispatch_pass_uses_capability_union() {
    // Neither consumer covers both capabilities alone; the union does.
    let orchestrator = GateOrchestrator::new();
    let outcome =
        orchestrator.validate_pre_dispatch(&admissible_signal("s1"), &registry(), Some("run-1"));

    assert!(outcome.success);
    assert_eq!(outcome.snapshot.failed_at, None);
    assert_eq!(
        outcome.snapshot.passed_gates,
        [GateId::ScopeAlignment, GateId::ValueAdd, GateId::Capability].into_iter().collect()
    );
}

#[test]
fn test_fail_fast_at_gate_two() {
    let orchestrator = GateOrchestrator::new();
    let signal = admissible_signal("s2").with_availability(0.05).with_capability("teleportation");
    let outcome = orchestrator.validate_pre_dispatch(&signal, &registry(), None);

    assert!(!outcome.success);
    assert_eq!(outcome.failed_gate_index, Some(2));
    assert!(matches!(outcome.last_result, GateResult::ValueAdd(_)));
    let ran: Vec<GateId> = outcome.snapshot.results.iter().map(|r| r.gate_id()).collect();
    assert_eq!(ran, vec![GateId::ScopeAlignment, GateId::ValueAdd]);
}

#[test]
fn test_gate_one_failure_reports_all_violations() {
    let orchestrator = GateOrchestrator::new();
    let signal = Signal::new("s3", "phase_11", "PA42", "MACRO_SCORE").with_availability(0.9);
    let outcome = orchestrator.validate_pre_dispatch(&signal, &registry(), None);

    assert_eq!(outcome.failed_gate_index, Some(1));
    match outcome.last_result {
        GateResult::ScopeAlignment(r) => {
            assert_eq!(
                r.errors,
                vec![ScopeViolation::InvalidPhase, ScopeViolation::InvalidPolicyArea]
            );
        }
        other => panic!("unexpected last result: {:?}", other),
    }
}

#[test]
fn test_post_dispatch_is_idempotent() {
    let orchestrator = GateOrchestrator::new();
    let signal = admissible_signal("s4")
        .routed_to(vec!["extractor".to_string(), "scorer".to_string()]);
    let audit = vec![AuditEntry::delivered("s4", "extractor")];
    let consumers = registry();

    let first = orchestrator.validate_post_dispatch(&signal, &audit, Some(&consumers));
    let second = orchestrator.validate_post_dispatch(&signal, &audit, Some(&consumers));

    assert!(first.all_passed);
    assert_eq!(first, second);
    assert_eq!(first.gate_4.as_ref().map(|g| g.consumer_count), Some(2));
}

#[test]
fn test_post_dispatch_catches_missing_audit() {
    let orchestrator = GateOrchestrator::new();
    let signal = admissible_signal("s5").routed_to(vec!["extractor".to_string()]);
    let report = orchestrator.validate_post_dispatch(&signal, &[], Some(&registry()));

    assert!(!report.all_passed);
    assert_eq!(report.failed_at_gate, Some(GateId::IrrigationChannel));
    assert!(report.gate_4.unwrap().message.contains("no audit trail"));
}

#[test]
fn test_post_dispatch_nulls_unreached_gates() {
    let orchestrator = GateOrchestrator::new();
    let signal = admissible_signal("s6")
        .with_availability(0.0)
        .routed_to(vec!["extractor".to_string()]);
    let report = orchestrator.validate_post_dispatch(&signal, &[], Some(&registry()));

    assert_eq!(report.failed_at_gate, Some(GateId::ValueAdd));
    assert!(report.gate_1.is_some());
    assert!(report.gate_2.is_some());
    assert!(report.gate_3.is_none());
    assert!(report.gate_4.is_none());
}

#[test]
fn test_unrouted_signal_passes_post_dispatch() {
    let orchestrator = GateOrchestrator::new();
    let report =
        orchestrator.validate_post_dispatch(&admissible_signal("s7"), &[], Some(&registry()));
    assert!(report.all_passed);
    assert_eq!(report.gate_4.unwrap().message, "Not routed");
}

#[test]
fn test_checkpoint_written_and_reloaded_after_clear() {
    let tmp = tempdir().unwrap();
    let config = IrrigationConfig {
        checkpoint_dir: Some(tmp.path().to_path_buf()),
        ..IrrigationConfig::default()
    };
    let orchestrator = GateOrchestrator::from_config(&config);
    let outcome =
        orchestrator.validate_pre_dispatch(&admissible_signal("s8"), &registry(), Some("ckpt-1"));

    let store = CheckpointStore::new(tmp.path());
    let on_disk = store.load("ckpt-1").unwrap().unwrap();
    assert_eq!(on_disk, outcome.snapshot);

    assert_eq!(orchestrator.clear_execution_history(), 1);
    // History is gone; the checkpoint still answers rollback queries.
    assert!(orchestrator.rollback_to_gate("ckpt-1", "gate_3").unwrap());
    assert_eq!(orchestrator.get_snapshot_by_id("ckpt-1"), Some(outcome.snapshot));
}

#[test]
fn test_unusable_execution_id_still_validates() {
    let tmp = tempdir().unwrap();
    let orchestrator = GateOrchestrator::new().with_checkpoint_dir(tmp.path());
    let outcome = orchestrator.validate_pre_dispatch(
        &admissible_signal("s9"),
        &registry(),
        Some("../escape"),
    );

    assert!(outcome.success);
    assert!(!tmp.path().join("../escape.json").exists());
    assert_eq!(orchestrator.get_execution_history().len(), 1);
}

#[test]
fn test_rollback_on_unknown_execution() {
    let orchestrator = GateOrchestrator::new();
    let err = orchestrator.rollback_to_gate("never-ran", "gate_1").unwrap_err();
    assert!(matches!(err, GateError::UnknownExecution(id) if id == "never-ran"));
}

#[test]
fn test_concurrent_validation_keeps_counts() {
    let orchestrator = Arc::new(GateOrchestrator::new());
    let consumers = Arc::new(registry());
    let threads = 8;
    let per_thread = 25;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let orchestrator = Arc::clone(&orchestrator);
            let consumers = Arc::clone(&consumers);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let availability = if i % 2 == 0 { 0.9 } else { 0.1 };
                    let signal = admissible_signal(&format!("t{}-{}", t, i))
                        .with_availability(availability);
                    orchestrator.validate_pre_dispatch(&signal, &consumers, None);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let metrics = orchestrator.get_metrics();
    assert_eq!(metrics.total_executions, (threads * per_thread) as u64);
    assert_eq!(orchestrator.get_execution_history().len(), threads * per_thread);
    let scope_rate = metrics.pass_rate(GateId::ScopeAlignment).unwrap();
    assert!((scope_rate - 1.0).abs() < 1e-9);
    let value_rate = metrics.pass_rate(GateId::ValueAdd).unwrap();
    assert!(value_rate > 0.0 && value_rate < 1.0);
}
