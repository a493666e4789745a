// ==========================================
// Demo database: one vessel, two warehouses, one short delivery
// ==========================================
// Usage: seed_demo_scenario [db_path]
// An existing database file is backed up then replaced.
// ==========================================

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use its_stock_ledger::app::{get_default_db_path, AppState};
use its_stock_ledger::domain::{AllocationRequest, NewCargoLine, NewShipment, RotationDetails};
use its_stock_ledger::logging;
use its_stock_ledger::RotationStatus;
use std::fs;
use std::path::Path;

const ACTOR: &str = "seed";

fn backup_and_reset_db(db_path: &str) -> Result<()> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path).with_context(|| format!("backup to {}", backup_path))?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn details(driver: &str, truck: &str) -> RotationDetails {
    RotationDetails {
        driver_name: Some(driver.to_string()),
        truck_number: Some(truck.to_string()),
        observations: None,
    }
}

fn main() -> Result<()> {
    logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    backup_and_reset_db(&db_path)?;
    let state = AppState::new(db_path.clone()).map_err(|e| anyhow!(e))?;

    state
        .warehouse_api
        .register_warehouse("Warehouse-A", "Magasin A", Some("Dakar - Bel Air"), ACTOR)?;
    state
        .warehouse_api
        .register_warehouse("Warehouse-B", "Magasin B", Some("Rufisque"), ACTOR)?;

    // vessel with one maize line
    let shipment = state.shipment_api.record_shipment(
        NewShipment {
            imo_number: Some("9074729".to_string()),
            flag: Some("Panama".to_string()),
            bill_of_lading: Some("BL-2024-0117".to_string()),
            ..NewShipment::vessel("MV-ATLANTIC")
        },
        vec![NewCargoLine {
            origin: Some("Argentine".to_string()),
            ..NewCargoLine::new("MAIZE", 1000.0)
        }],
        ACTOR,
    )?;
    let cargo_line_id = shipment.cargo_lines[0].cargo_line_id.clone();

    let dispatches = state.dispatch_api.allocate(
        &cargo_line_id,
        vec![
            AllocationRequest::new("Warehouse-A", 600.0),
            AllocationRequest::new("Warehouse-B", 400.0),
        ],
        ACTOR,
    )?;

    // Warehouse-A: two full rotations
    let to_a = &dispatches[0];
    for (driver, truck) in [("Mamadou Fall", "DK-4512-A"), ("Ibrahima Sarr", "DK-7781-B")] {
        let rotation = state
            .rotation_api
            .create_rotation(&to_a.dispatch_id, Some(300.0), details(driver, truck), ACTOR)?;
        state.rotation_api.start_rotation(&rotation.rotation_id, ACTOR)?;
        state.rotation_api.complete_rotation(
            &rotation.rotation_id,
            300.0,
            RotationStatus::Delivered,
            None,
            "magasinier-a",
        )?;
    }

    // Warehouse-B: one rotation arrives 50t short
    let to_b = &dispatches[1];
    let rotation = state
        .rotation_api
        .create_rotation(&to_b.dispatch_id, None, details("Awa Diop", "TH-0921-C"), ACTOR)?;
    state.rotation_api.start_rotation(&rotation.rotation_id, ACTOR)?;
    state.rotation_api.complete_rotation(
        &rotation.rotation_id,
        350.0,
        RotationStatus::ShortDelivered,
        Some("bâche déchirée, sacs perdus"),
        "magasinier-b",
    )?;

    for row in state.report_api.stock_overview()? {
        println!(
            "{:<12} {:<8} received {:>8.3}",
            row.warehouse_id, row.product_reference, row.total_received
        );
    }
    eprintln!("Seeded {}", db_path);
    Ok(())
}
