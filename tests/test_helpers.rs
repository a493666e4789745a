// ==========================================
// Test helpers
// ==========================================
// Temporary ledger databases and the usual fixtures: warehouses, one
// maize shipment, rotations driven to completion.
// ==========================================

#![allow(dead_code)]

use its_stock_ledger::app::AppState;
use its_stock_ledger::domain::{
    AllocationRequest, CargoLine, Dispatch, NewCargoLine, NewShipment, Rotation, RotationDetails,
};
use its_stock_ledger::RotationStatus;
use tempfile::NamedTempFile;

pub const ACTOR: &str = "test-operator";

/// Ledger on a fresh temporary file
///
/// # Returns
/// - NamedTempFile: keep it alive for the duration of the test
/// - AppState
pub fn create_test_state() -> (NamedTempFile, AppState) {
    its_stock_ledger::logging::init_test();
    let temp_file = NamedTempFile::new().unwrap();
    let state = AppState::new(db_path_of(&temp_file)).unwrap();
    (temp_file, state)
}

pub fn db_path_of(file: &NamedTempFile) -> String {
    file.path().to_str().unwrap().to_string()
}

pub fn register_warehouses(state: &AppState, ids: &[&str]) {
    for id in ids {
        state
            .warehouse_api
            .register_warehouse(id, &format!("Magasin {}", id), None, ACTOR)
            .unwrap();
    }
}

/// Record one vessel with a single cargo line
pub fn record_single_line(state: &AppState, vessel: &str, product: &str, declared: f64) -> CargoLine {
    let shipment = state
        .shipment_api
        .record_shipment(
            NewShipment::vessel(vessel),
            vec![NewCargoLine::new(product, declared)],
            ACTOR,
        )
        .unwrap();
    shipment.cargo_lines[0].clone()
}

/// Warehouses + a maize line allocated in one call
pub fn allocated_line(state: &AppState, allocations: &[(&str, f64)]) -> (CargoLine, Vec<Dispatch>) {
    let ids: Vec<&str> = allocations.iter().map(|(w, _)| *w).collect();
    register_warehouses(state, &ids);
    let declared: f64 = allocations.iter().map(|(_, q)| q).sum();
    let line = record_single_line(state, "MV-ATLANTIC", "MAIZE", declared);
    let dispatches = state
        .dispatch_api
        .allocate(
            &line.cargo_line_id,
            allocations
                .iter()
                .map(|(w, q)| AllocationRequest::new(*w, *q))
                .collect(),
            ACTOR,
        )
        .unwrap();
    (line, dispatches)
}

pub fn driver(name: &str) -> RotationDetails {
    RotationDetails {
        driver_name: Some(name.to_string()),
        truck_number: None,
        observations: None,
    }
}

/// create → start → complete
pub fn deliver(
    state: &AppState,
    dispatch_id: &str,
    planned: f64,
    delivered: f64,
    status: RotationStatus,
    details: RotationDetails,
) -> Rotation {
    let rotation = state
        .rotation_api
        .create_rotation(dispatch_id, Some(planned), details, ACTOR)
        .unwrap();
    state
        .rotation_api
        .start_rotation(&rotation.rotation_id, ACTOR)
        .unwrap();
    state
        .rotation_api
        .complete_rotation(&rotation.rotation_id, delivered, status, None, "magasinier")
        .unwrap()
}
