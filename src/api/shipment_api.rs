// ==========================================
// ITS Stock Ledger - ingestion ledger API
// ==========================================
// Records vessel arrivals and their cargo lines. Cargo lines are written
// once here and never modified afterwards.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::{lock_conn, require_actor};
use crate::config::{ConfigManager, LedgerConfigReader};
use crate::db::begin_immediate;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::shipment::{CargoLine, NewCargoLine, NewShipment, Shipment, ShipmentWithCargo};
use crate::domain::types::ShipmentStatus;
use crate::engine::error::RuleViolation;
use crate::engine::quantity::{ensure_not_blank, ensure_positive};
use crate::importer::ManifestImporter;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::shipment_repo::ShipmentRepository;
use rusqlite::Connection;
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub struct ShipmentApi {
    conn: Arc<Mutex<Connection>>,
    shipment_repo: Arc<ShipmentRepository>,
    config_manager: Arc<ConfigManager>,
    importer: ManifestImporter,
}

impl ShipmentApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        shipment_repo: Arc<ShipmentRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            conn,
            shipment_repo,
            config_manager,
            importer: ManifestImporter::new(),
        }
    }

    // ==========================================
    // Writes
    // ==========================================

    /// Record a vessel arrival with its cargo lines
    ///
    /// # Errors
    /// - validation when the vessel name or a product reference is blank,
    ///   when the cargo list is empty or a declared quantity is not > 0
    pub fn record_shipment(
        &self,
        new_shipment: NewShipment,
        cargo: Vec<NewCargoLine>,
        actor: &str,
    ) -> ApiResult<ShipmentWithCargo> {
        let actor = require_actor(actor)?;
        let vessel_name = ensure_not_blank("vessel_name", &new_shipment.vessel_name)?;
        if cargo.is_empty() {
            return Err(RuleViolation::EmptyCargo.into());
        }

        // config reads lock the shared connection: done before the transaction
        let default_port = self.config_manager.get_default_port()?;
        let default_unit = self.config_manager.get_default_unit()?;

        let now = chrono::Local::now().naive_local();
        let shipment_id = Uuid::new_v4().to_string();

        let mut cargo_lines = Vec::with_capacity(cargo.len());
        for (idx, line) in cargo.into_iter().enumerate() {
            let product_reference = ensure_not_blank("product_reference", &line.product_reference)?;
            let declared_quantity = ensure_positive("declared_quantity", line.declared_quantity)?;
            cargo_lines.push(CargoLine {
                cargo_line_id: Uuid::new_v4().to_string(),
                shipment_id: shipment_id.clone(),
                line_no: idx as i32 + 1,
                product_reference,
                declared_quantity,
                unit: blank_to_none(line.unit).unwrap_or_else(|| default_unit.clone()),
                origin: blank_to_none(line.origin),
                created_at: now,
            });
        }

        let shipment = Shipment {
            shipment_id: shipment_id.clone(),
            vessel_name,
            imo_number: blank_to_none(new_shipment.imo_number),
            flag: blank_to_none(new_shipment.flag),
            port: blank_to_none(new_shipment.port).unwrap_or(default_port),
            arrival_date: new_shipment.arrival_date.unwrap_or_else(|| now.date()),
            bill_of_lading: blank_to_none(new_shipment.bill_of_lading),
            maritime_agent: blank_to_none(new_shipment.maritime_agent),
            status: ShipmentStatus::Received,
            received_by: actor.clone(),
            observations: blank_to_none(new_shipment.observations),
            created_at: now,
        };

        let result = ShipmentWithCargo {
            shipment,
            cargo_lines,
        };

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;
        ShipmentRepository::insert_shipment_tx(&tx, &result.shipment)?;
        ShipmentRepository::insert_cargo_lines_tx(&tx, &result.cargo_lines)?;
        ActionLogRepository::insert_tx(
            &tx,
            &ActionLog::new(
                ActionType::RecordShipment,
                &shipment_id,
                &actor,
                Some(json!({
                    "vessel_name": result.shipment.vessel_name,
                    "cargo_lines": result.cargo_lines.len(),
                    "total_declared": result.total_declared(),
                })),
            ),
        )?;
        tx.commit()?;

        info!(
            shipment_id = %shipment_id,
            vessel = %result.shipment.vessel_name,
            cargo_lines = result.cargo_lines.len(),
            total_declared = result.total_declared(),
            actor = %actor,
            "shipment recorded"
        );
        Ok(result)
    }

    /// Parse a CSV / Excel cargo manifest and record it as one shipment
    pub fn import_manifest<P: AsRef<Path>>(
        &self,
        new_shipment: NewShipment,
        path: P,
        actor: &str,
    ) -> ApiResult<ShipmentWithCargo> {
        let cargo = self.importer.parse_file(path)?;
        self.record_shipment(new_shipment, cargo, actor)
    }

    // ==========================================
    // Reads
    // ==========================================

    pub fn get_shipment(&self, shipment_id: &str) -> ApiResult<ShipmentWithCargo> {
        let shipment = self
            .shipment_repo
            .find_shipment(shipment_id)?
            .ok_or_else(|| ApiError::not_found("Shipment", shipment_id))?;
        let cargo_lines = self.shipment_repo.list_cargo_lines(shipment_id)?;
        debug!(shipment_id, cargo_lines = cargo_lines.len(), "shipment read");
        Ok(ShipmentWithCargo {
            shipment,
            cargo_lines,
        })
    }

    pub fn list_shipments(&self) -> ApiResult<Vec<Shipment>> {
        Ok(self.shipment_repo.list_shipments()?)
    }

    pub fn get_cargo_line(&self, cargo_line_id: &str) -> ApiResult<CargoLine> {
        self.shipment_repo
            .find_cargo_line(cargo_line_id)?
            .ok_or_else(|| ApiError::not_found("CargoLine", cargo_line_id))
    }
}
