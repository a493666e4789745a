// ==========================================
// Allocation and rotation-sum invariants
// ==========================================
// Boundary cases for both allocation policies, request validation, and
// property tests replaying random operation sequences against a model.
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod allocation_invariant_test {
    use crate::test_helpers::*;
    use its_stock_ledger::api::ApiErrorKind;
    use its_stock_ledger::app::AppState;
    use its_stock_ledger::config::config_keys;
    use its_stock_ledger::domain::{AllocationRequest, RotationDetails};
    use its_stock_ledger::engine::RuleViolation;
    use its_stock_ledger::ApiError;
    use proptest::prelude::*;

    fn partial_policy(state: &AppState) {
        state
            .config_manager
            .set_config(config_keys::ALLOCATION_POLICY, "PARTIAL", ACTOR)
            .unwrap();
    }

    fn allocated_sum(state: &AppState, cargo_line_id: &str) -> f64 {
        state
            .dispatch_api
            .list_dispatches_for_cargo_line(cargo_line_id)
            .unwrap()
            .iter()
            .map(|d| d.planned_quantity)
            .sum()
    }

    // ==========================================
    // EXACT policy
    // ==========================================

    #[test]
    fn test_exact_policy_requires_closing_the_line() {
        let (_tmp, state) = create_test_state();
        register_warehouses(&state, &["W-A", "W-B"]);
        let line = record_single_line(&state, "MV-ATLANTIC", "MAIZE", 1000.0);

        let err = state
            .dispatch_api
            .allocate(&line.cargo_line_id, vec![AllocationRequest::new("W-A", 999.0)], ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::InvariantViolation);
        assert!(matches!(err, ApiError::Rule(RuleViolation::AllocationMismatch { .. })));
        assert_eq!(allocated_sum(&state, &line.cargo_line_id), 0.0);

        state
            .dispatch_api
            .allocate(&line.cargo_line_id, vec![AllocationRequest::new("W-A", 1000.0)], ACTOR)
            .unwrap();

        // the line is closed: any further quantity is an over-allocation
        let err = state
            .dispatch_api
            .allocate(&line.cargo_line_id, vec![AllocationRequest::new("W-B", 1.0)], ACTOR)
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Rule(RuleViolation::AllocationExceedsDeclared { .. })
        ));
    }

    #[test]
    fn test_exact_policy_tolerates_float_sums() {
        let (_tmp, state) = create_test_state();
        register_warehouses(&state, &["W-A", "W-B", "W-C"]);
        let line = record_single_line(&state, "MV-ATLANTIC", "RICE", 1.0);

        let dispatches = state
            .dispatch_api
            .allocate(
                &line.cargo_line_id,
                vec![
                    AllocationRequest::new("W-A", 0.1),
                    AllocationRequest::new("W-B", 0.2),
                    AllocationRequest::new("W-C", 0.7),
                ],
                ACTOR,
            )
            .unwrap();
        assert_eq!(dispatches.len(), 3);
    }

    // ==========================================
    // PARTIAL policy
    // ==========================================

    #[test]
    fn test_partial_policy_accumulates_up_to_declared() {
        let (_tmp, state) = create_test_state();
        partial_policy(&state);
        register_warehouses(&state, &["W-A", "W-B"]);
        let line = record_single_line(&state, "MV-ATLANTIC", "MAIZE", 1000.0);

        state
            .dispatch_api
            .allocate(&line.cargo_line_id, vec![AllocationRequest::new("W-A", 300.0)], ACTOR)
            .unwrap();
        let shipment = state.shipment_api.get_shipment(&line.shipment_id).unwrap();
        assert_eq!(shipment.shipment.status.to_db_str(), "RECEIVED");

        state
            .dispatch_api
            .allocate(&line.cargo_line_id, vec![AllocationRequest::new("W-B", 700.0)], ACTOR)
            .unwrap();
        let shipment = state.shipment_api.get_shipment(&line.shipment_id).unwrap();
        assert_eq!(shipment.shipment.status.to_db_str(), "DISPATCHED");

        let err = state
            .dispatch_api
            .allocate(&line.cargo_line_id, vec![AllocationRequest::new("W-A", 0.5)], ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::InvariantViolation);
        assert_eq!(allocated_sum(&state, &line.cargo_line_id), 1000.0);
    }

    // ==========================================
    // Request validation
    // ==========================================

    #[test]
    fn test_request_validation() {
        let (_tmp, state) = create_test_state();
        register_warehouses(&state, &["W-A", "W-B"]);
        let line = record_single_line(&state, "MV-ATLANTIC", "MAIZE", 100.0);
        let id = &line.cargo_line_id;

        let cases: Vec<Vec<AllocationRequest>> = vec![
            vec![],
            vec![AllocationRequest::new("W-A", 50.0), AllocationRequest::new("W-A", 50.0)],
            vec![AllocationRequest::new("W-A", -100.0)],
            vec![AllocationRequest::new("W-A", 0.0)],
            vec![AllocationRequest::new("W-A", f64::INFINITY)],
            vec![AllocationRequest::new(" ", 100.0)],
        ];
        for requests in cases {
            let err = state.dispatch_api.allocate(id, requests, ACTOR).unwrap_err();
            assert_eq!(err.kind(), ApiErrorKind::Validation);
        }

        // unknown warehouse
        let err = state
            .dispatch_api
            .allocate(id, vec![AllocationRequest::new("W-Z", 100.0)], ACTOR)
            .unwrap_err();
        assert!(matches!(err, ApiError::UnknownReference { .. }));
        assert_eq!(err.kind(), ApiErrorKind::Validation);

        // inactive warehouse
        state.warehouse_api.set_warehouse_active("W-B", false, ACTOR).unwrap();
        let err = state
            .dispatch_api
            .allocate(id, vec![AllocationRequest::new("W-B", 100.0)], ACTOR)
            .unwrap_err();
        assert!(matches!(err, ApiError::UnknownReference { .. }));

        // unknown cargo line
        let err = state
            .dispatch_api
            .allocate("missing", vec![AllocationRequest::new("W-A", 100.0)], ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::NotFound);

        assert_eq!(allocated_sum(&state, id), 0.0);
    }

    // ==========================================
    // Property tests
    // ==========================================

    #[derive(Debug, Clone)]
    enum RotationOp {
        Create(u32),
        Cancel(usize),
    }

    fn rotation_op() -> impl Strategy<Value = RotationOp> {
        prop_oneof![
            3 => (1u32..=60).prop_map(RotationOp::Create),
            1 => (0usize..8).prop_map(RotationOp::Cancel),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn partial_allocations_never_exceed_declared(
            declared in 100u32..=1000,
            requests in prop::collection::vec(1u32..=400, 1..8),
        ) {
            let (_tmp, state) = create_test_state();
            partial_policy(&state);
            register_warehouses(&state, &["W-A"]);
            let line = record_single_line(&state, "MV-PROP", "MAIZE", declared as f64);

            let mut model = 0u32;
            for q in requests {
                let result = state.dispatch_api.allocate(
                    &line.cargo_line_id,
                    vec![AllocationRequest::new("W-A", q as f64)],
                    ACTOR,
                );
                if model + q <= declared {
                    prop_assert!(result.is_ok());
                    model += q;
                } else {
                    let err = result.unwrap_err();
                    prop_assert_eq!(err.kind(), ApiErrorKind::InvariantViolation);
                }
            }

            let stored = allocated_sum(&state, &line.cargo_line_id);
            prop_assert_eq!(stored, model as f64);
            prop_assert!(stored <= declared as f64);
        }

        #[test]
        fn active_rotations_never_exceed_dispatch(
            ops in prop::collection::vec(rotation_op(), 1..12),
        ) {
            let (_tmp, state) = create_test_state();
            let (_line, dispatches) = allocated_line(&state, &[("W-A", 100.0)]);
            let dispatch_id = dispatches[0].dispatch_id.clone();

            // (rotation_id, planned, cancelled)
            let mut created: Vec<(String, u32, bool)> = Vec::new();
            for op in ops {
                let active: u32 = created.iter().filter(|r| !r.2).map(|r| r.1).sum();
                match op {
                    RotationOp::Create(q) => {
                        let result = state.rotation_api.create_rotation(
                            &dispatch_id,
                            Some(q as f64),
                            RotationDetails::default(),
                            ACTOR,
                        );
                        if active + q <= 100 {
                            let rotation = result.unwrap();
                            created.push((rotation.rotation_id, q, false));
                        } else {
                            prop_assert_eq!(result.unwrap_err().kind(), ApiErrorKind::InvariantViolation);
                        }
                    }
                    RotationOp::Cancel(idx) => {
                        if let Some(entry) = created.get_mut(idx) {
                            let result = state.rotation_api.cancel_rotation(&entry.0, ACTOR);
                            if entry.2 {
                                prop_assert_eq!(result.unwrap_err().kind(), ApiErrorKind::InvalidState);
                            } else {
                                prop_assert!(result.is_ok());
                                entry.2 = true;
                            }
                        }
                    }
                }
            }

            let listed = state.rotation_api.list_rotations_for_dispatch(&dispatch_id).unwrap();
            let model: u32 = created.iter().filter(|r| !r.2).map(|r| r.1).sum();
            prop_assert_eq!(listed.summary.total_planned, model as f64);
            prop_assert!(listed.summary.total_planned <= 100.0);
        }
    }
}
