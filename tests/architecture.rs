//! Architecture Verification Suite
//!
//! Thread-safety and wire-shape checks for the public surface.

#[cfg(test)]
mod architecture_tests {
    use signal_irrigation::gates::GateId;
    use signal_irrigation::orchestrator::GateExecutionSnapshot;

    // 1. Shared components must cross thread boundaries.
    #[test]
    fn test_shared_components_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<signal_irrigation::GateOrchestrator>();
        assert_send_sync::<signal_irrigation::orchestrator::CheckpointStore>();
        assert_send_sync::<signal_irrigation::SemanticPatternExpander>();
        assert_send_sync::<signal_irrigation::ExpansionValidator>();
    }

    // 2. Gates are stateless values.
    #[test]
    fn test_gates_are_copy() {
        fn assert_copy<T: Copy>() {}

        assert_copy::<signal_irrigation::gates::ScopeAlignmentGate>();
        assert_copy::<signal_irrigation::gates::ValueAddGate>();
        assert_copy::<signal_irrigation::gates::CapabilityGate>();
        assert_copy::<signal_irrigation::gates::IrrigationChannelGate>();
    }

    // 3. Checkpoint schema: gate ids and the result tag are stable on the wire.
    #[test]
    fn test_snapshot_wire_shape() {
        let raw = r#"{
            "execution_id": "exec-7",
            "signal_id": "sig-7",
            "gate_sequence": ["gate_1", "gate_2", "gate_3"],
            "passed_gates": ["gate_1"],
            "failed_at": "gate_2",
            "results": [
                {"gate": "scope_alignment", "is_valid": true, "errors": [],
                 "phase": "phase_2", "policy_area": "PA01", "signal_type": "PATTERN_MATCH"},
                {"gate": "value_add", "is_valid": false, "score": 0.1, "threshold": 0.3,
                 "is_enrichment": false, "message": "Value score 0.10 below threshold 0.30"}
            ],
            "timestamp": "2026-03-01T12:00:00Z"
        }"#;

        let snapshot: GateExecutionSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.failed_at, Some(GateId::ValueAdd));
        assert!(!snapshot.succeeded());
        assert_eq!(snapshot.results.len(), 2);

        let back = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(back["gate_sequence"][2], "gate_3");
        assert_eq!(back["results"][1]["gate"], "value_add");
    }
}
