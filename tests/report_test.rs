// ==========================================
// Reports: outstanding, discrepancies, warehouse performance, stock
// overview, CSV, audit trail
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod report_test {
    use crate::test_helpers::*;
    use chrono::{Duration, Local};
    use its_stock_ledger::api::ApiErrorKind;
    use its_stock_ledger::app::AppState;
    use its_stock_ledger::domain::{DiscrepancyFilter, Dispatch, PeriodFilter, RotationDetails};
    use its_stock_ledger::{ReconciliationStatus, RotationStatus};

    /// W-A: 600 planned, 2 rotations of 300, one 20 short
    /// W-B: 400 planned, one rotation 400 in transit
    fn seeded() -> (tempfile::NamedTempFile, AppState, Vec<Dispatch>) {
        let (tmp, state) = create_test_state();
        let (_line, dispatches) = allocated_line(&state, &[("W-A", 600.0), ("W-B", 400.0)]);

        deliver(&state, &dispatches[0].dispatch_id, 300.0, 300.0, RotationStatus::Delivered, driver("Fall"));
        deliver(&state, &dispatches[0].dispatch_id, 300.0, 280.0, RotationStatus::ShortDelivered, driver("Diop"));

        let on_road = state
            .rotation_api
            .create_rotation(&dispatches[1].dispatch_id, None, RotationDetails::default(), ACTOR)
            .unwrap();
        state.rotation_api.start_rotation(&on_road.rotation_id, ACTOR).unwrap();

        (tmp, state, dispatches)
    }

    #[test]
    fn test_outstanding_report() {
        let (_tmp, state, dispatches) = seeded();

        let rows = state.report_api.outstanding_report(None).unwrap();
        assert_eq!(rows.len(), 2);

        let a = rows.iter().find(|r| r.dispatch_id == dispatches[0].dispatch_id).unwrap();
        assert_eq!(a.received_quantity, 580.0);
        assert_eq!(a.outstanding_quantity, 20.0);
        assert_eq!(a.reconciliation, ReconciliationStatus::Short);

        let b = rows.iter().find(|r| r.dispatch_id == dispatches[1].dispatch_id).unwrap();
        assert_eq!(b.scheduled_quantity, 400.0);
        assert_eq!(b.received_quantity, 0.0);
        assert_eq!(b.open_rotations, 1);
        assert_eq!(b.reconciliation, ReconciliationStatus::Open);
    }

    #[test]
    fn test_excess_flags_rows_edited_outside_the_ledger() {
        let (tmp, state, dispatches) = seeded();
        let rotations = state
            .rotation_api
            .list_rotations_for_dispatch(&dispatches[0].dispatch_id)
            .unwrap()
            .rotations;

        let raw = rusqlite::Connection::open(tmp.path()).unwrap();
        raw.execute(
            "UPDATE rotation SET delivered_quantity = 320.0 WHERE rotation_id = ?1",
            [&rotations[1].rotation_id],
        )
        .unwrap();

        let rows = state.report_api.outstanding_report(Some("W-A")).unwrap();
        assert_eq!(rows[0].received_quantity, 620.0);
        assert_eq!(rows[0].reconciliation, ReconciliationStatus::Excess);
    }

    #[test]
    fn test_discrepancy_report_and_filters() {
        let (_tmp, state, _dispatches) = seeded();

        let report = state
            .report_api
            .discrepancy_report(&DiscrepancyFilter::default())
            .unwrap();
        assert_eq!(report.lines.len(), 1);
        assert_eq!(report.total_shortfall, 20.0);
        assert_eq!(report.by_driver.len(), 1);
        assert_eq!(report.by_driver[0].driver_name, "Diop");
        assert_eq!(report.by_driver[0].average_shortfall, 20.0);

        let other_warehouse = state
            .report_api
            .discrepancy_report(&DiscrepancyFilter {
                warehouse_id: Some("W-B".to_string()),
                ..DiscrepancyFilter::default()
            })
            .unwrap();
        assert!(other_warehouse.lines.is_empty());

        let tomorrow = Local::now().date_naive() + Duration::days(1);
        let future = state
            .report_api
            .discrepancy_report(&DiscrepancyFilter {
                from: Some(tomorrow),
                ..DiscrepancyFilter::default()
            })
            .unwrap();
        assert!(future.lines.is_empty());

        let inverted = state
            .report_api
            .discrepancy_report(&DiscrepancyFilter {
                from: Some(tomorrow),
                to: Some(tomorrow - Duration::days(3)),
                ..DiscrepancyFilter::default()
            })
            .unwrap_err();
        assert_eq!(inverted.kind(), ApiErrorKind::Validation);
    }

    #[test]
    fn test_warehouse_performance() {
        let (_tmp, state, _dispatches) = seeded();

        let rows = state
            .report_api
            .warehouse_performance(&PeriodFilter::default())
            .unwrap();
        assert_eq!(rows.len(), 2);

        let a = &rows[0];
        assert_eq!(a.warehouse_id, "W-A");
        assert_eq!(a.warehouse_name, "Magasin W-A");
        assert_eq!(a.dispatch_count, 1);
        assert_eq!(a.closed_dispatch_count, 1);
        assert_eq!(a.short_dispatch_count, 1);
        assert_eq!(a.conforming_dispatch_count, 0);
        assert_eq!(a.received_quantity, 580.0);
        assert_eq!(a.shortfall_quantity, 20.0);
        assert_eq!(a.reception_rate, 100.0);
        assert_eq!(a.conformity_rate, Some(0.0));

        // nothing closed yet: no conformity rate, sorted last
        let b = &rows[1];
        assert_eq!(b.warehouse_id, "W-B");
        assert_eq!(b.open_dispatch_count, 1);
        assert_eq!(b.outstanding_quantity, 400.0);
        assert_eq!(b.shortfall_quantity, 0.0);
        assert_eq!(b.reception_rate, 0.0);
        assert_eq!(b.conformity_rate, None);

        let tomorrow = Local::now().date_naive() + Duration::days(1);
        let future = state
            .report_api
            .warehouse_performance(&PeriodFilter {
                from: Some(tomorrow),
                to: None,
            })
            .unwrap();
        assert!(future.is_empty());

        let err = state
            .report_api
            .warehouse_performance(&PeriodFilter {
                from: Some(tomorrow),
                to: Some(tomorrow - Duration::days(1)),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Validation);
    }

    #[test]
    fn test_warehouse_totals_are_stable_across_reads() {
        let (_tmp, state) = create_test_state();
        let (_line, dispatches) = allocated_line(&state, &[("W-A", 500.0)]);
        let dispatch_id = &dispatches[0].dispatch_id;

        deliver(&state, dispatch_id, 200.0, 200.0, RotationStatus::Delivered, driver("Fall"));
        deliver(&state, dispatch_id, 150.0, 141.5, RotationStatus::ShortDelivered, driver("Diop"));
        let dropped = state
            .rotation_api
            .create_rotation(dispatch_id, Some(100.0), driver("Ndiaye"), ACTOR)
            .unwrap();
        state.rotation_api.cancel_rotation(&dropped.rotation_id, ACTOR).unwrap();
        deliver(&state, dispatch_id, 100.0, 99.25, RotationStatus::ShortDelivered, driver("Sow"));

        let first = state.rotation_api.get_warehouse_totals("W-A").unwrap();
        let second = state.rotation_api.get_warehouse_totals("W-A").unwrap();
        assert_eq!(first, second);

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].rotation_count, 3);
        assert_eq!(first[0].total_planned, 450.0);
        assert_eq!(first[0].total_received, 440.75);
    }

    #[test]
    fn test_stock_overview_counts_received_only() {
        let (_tmp, state, _dispatches) = seeded();

        let overview = state.report_api.stock_overview().unwrap();
        let a = overview.iter().find(|r| r.warehouse_id == "W-A").unwrap();
        assert_eq!(a.product_reference, "MAIZE");
        assert_eq!(a.total_received, 580.0);
        assert!(overview
            .iter()
            .filter(|r| r.warehouse_id == "W-B")
            .all(|r| r.total_received == 0.0));
    }

    #[test]
    fn test_csv_exports() {
        let (_tmp, state, _dispatches) = seeded();

        let mut buf = Vec::new();
        let rows = state
            .report_api
            .export_discrepancies_csv(&DiscrepancyFilter::default(), &mut buf)
            .unwrap();
        assert_eq!(rows, 1);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("rotation_id,"));
        assert!(text.contains("300.000,280.000,20.000"));

        let mut buf = Vec::new();
        let rows = state
            .report_api
            .export_warehouse_totals_csv("W-A", &mut buf)
            .unwrap();
        assert_eq!(rows, 1);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("W-A,MAIZE,2,600.000,300.000,280.000,580.000,20.000"));

        let err = state
            .report_api
            .export_warehouse_totals_csv("W-Z", Vec::new())
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::NotFound);
    }

    #[test]
    fn test_action_log_trail() {
        let (_tmp, state, dispatches) = seeded();

        let rotations = state
            .rotation_api
            .list_rotations_for_dispatch(&dispatches[0].dispatch_id)
            .unwrap()
            .rotations;
        let trail = state
            .report_api
            .list_action_logs_for_entity(&rotations[1].rotation_id)
            .unwrap();
        let types: Vec<&str> = trail.iter().map(|l| l.action_type.as_str()).collect();
        assert_eq!(types, vec!["CREATE_ROTATION", "START_ROTATION", "COMPLETE_ROTATION"]);

        let completion = trail[2].payload_json.as_ref().unwrap();
        assert_eq!(completion["status"], "SHORT_DELIVERED");
        assert_eq!(completion["shortfall"], 20.0);

        let recent = state.report_api.list_action_logs(3).unwrap();
        assert_eq!(recent.len(), 3);
    }
}
