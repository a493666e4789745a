// ==========================================
// ITS Stock Ledger - dispatch allocator API
// ==========================================
// Splits a cargo line into per-warehouse dispatches.
// Invariant: SUM(dispatch.planned_quantity) <= cargo_line.declared_quantity
// over non-cancelled dispatches, checked on figures re-read under
// BEGIN IMMEDIATE.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::{lock_conn, require_actor};
use crate::config::ConfigManager;
use crate::db::begin_immediate;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::dispatch::{AllocationRequest, Dispatch};
use crate::domain::report::CargoLineBalance;
use crate::domain::types::{DispatchStatus, ShipmentStatus};
use crate::engine::AllocationEngine;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::dispatch_repo::DispatchRepository;
use crate::repository::report_repo::ReportRepository;
use crate::repository::rotation_repo::RotationRepository;
use crate::repository::shipment_repo::ShipmentRepository;
use crate::repository::warehouse_repo::WarehouseRepository;
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

pub struct DispatchApi {
    conn: Arc<Mutex<Connection>>,
    dispatch_repo: Arc<DispatchRepository>,
    report_repo: Arc<ReportRepository>,
    allocation_engine: Arc<AllocationEngine<ConfigManager>>,
}

impl DispatchApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        dispatch_repo: Arc<DispatchRepository>,
        report_repo: Arc<ReportRepository>,
        allocation_engine: Arc<AllocationEngine<ConfigManager>>,
    ) -> Self {
        Self {
            conn,
            dispatch_repo,
            report_repo,
            allocation_engine,
        }
    }

    /// Allocate a cargo line to one or more warehouses
    ///
    /// All dispatches of the call are written in one transaction, or none.
    /// Warehouse stock is not touched: totals only move when rotations
    /// are completed.
    ///
    /// # Errors
    /// - validation: empty list, bad quantity, repeated or unknown warehouse
    /// - NotFound: unknown cargo line
    /// - invariant: `AllocationExceedsDeclared`, `AllocationMismatch`
    pub fn allocate(
        &self,
        cargo_line_id: &str,
        requests: Vec<AllocationRequest>,
        actor: &str,
    ) -> ApiResult<Vec<Dispatch>> {
        let actor = require_actor(actor)?;
        let rules = self.allocation_engine.rules()?;
        let requested = rules.validate_requests(&requests)?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;

        let cargo_line = ShipmentRepository::find_cargo_line_tx(&tx, cargo_line_id)?
            .ok_or_else(|| ApiError::not_found("CargoLine", cargo_line_id))?;

        for request in &requests {
            let warehouse_id = request.warehouse_id.trim();
            match WarehouseRepository::find_by_id_tx(&tx, warehouse_id)? {
                Some(w) if w.active => {}
                _ => return Err(ApiError::unknown_reference("warehouse", warehouse_id)),
            }
        }

        let already = DispatchRepository::sum_planned_for_cargo_line_tx(&tx, cargo_line_id)?;
        if let Err(violation) = rules.check_against_declared(
            cargo_line_id,
            cargo_line.declared_quantity,
            already,
            requested,
        ) {
            warn!(
                cargo_line_id,
                declared = cargo_line.declared_quantity,
                already_allocated = already,
                requested,
                policy = %rules.policy,
                "allocation rejected: {}",
                violation
            );
            return Err(violation.into());
        }

        let now = chrono::Local::now().naive_local();
        let dispatches: Vec<Dispatch> = requests
            .iter()
            .map(|r| Dispatch {
                dispatch_id: Uuid::new_v4().to_string(),
                cargo_line_id: cargo_line.cargo_line_id.clone(),
                shipment_id: cargo_line.shipment_id.clone(),
                warehouse_id: r.warehouse_id.trim().to_string(),
                product_reference: cargo_line.product_reference.clone(),
                planned_quantity: r.quantity,
                status: DispatchStatus::Planned,
                created_by: actor.clone(),
                created_at: now,
                updated_at: now,
            })
            .collect();
        DispatchRepository::batch_insert_tx(&tx, &dispatches)?;

        let open_lines =
            ShipmentRepository::count_open_cargo_lines_tx(&tx, &cargo_line.shipment_id, rules.tolerance)?;
        let shipment_dispatched = open_lines == 0;
        if shipment_dispatched {
            ShipmentRepository::update_status_tx(&tx, &cargo_line.shipment_id, ShipmentStatus::Dispatched)?;
        }

        ActionLogRepository::insert_tx(
            &tx,
            &ActionLog::new(
                ActionType::Allocate,
                cargo_line_id,
                &actor,
                Some(json!({
                    "policy": rules.policy.to_db_str(),
                    "declared": cargo_line.declared_quantity,
                    "already_allocated": already,
                    "dispatches": dispatches
                        .iter()
                        .map(|d| json!({
                            "dispatch_id": d.dispatch_id,
                            "warehouse_id": d.warehouse_id,
                            "planned_quantity": d.planned_quantity,
                        }))
                        .collect::<Vec<_>>(),
                })),
            ),
        )?;
        tx.commit()?;

        info!(
            cargo_line_id,
            shipment_id = %cargo_line.shipment_id,
            dispatches = dispatches.len(),
            requested,
            allocated_after = already + requested,
            shipment_dispatched,
            actor = %actor,
            "cargo line allocated"
        );
        Ok(dispatches)
    }

    /// PLANNED → CANCELLED; the quantity returns to the cargo line
    ///
    /// Only a dispatch with no open or completed rotation can be
    /// cancelled. A DISPATCHED shipment goes back to RECEIVED when the
    /// cargo line is no longer fully allocated.
    pub fn cancel_dispatch(&self, dispatch_id: &str, reason: Option<&str>, actor: &str) -> ApiResult<Dispatch> {
        let actor = require_actor(actor)?;
        let rules = self.allocation_engine.rules()?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;

        let dispatch = DispatchRepository::find_by_id_tx(&tx, dispatch_id)?
            .ok_or_else(|| ApiError::not_found("Dispatch", dispatch_id))?;
        let progress = RotationRepository::dispatch_progress_tx(&tx, dispatch_id)?;
        if dispatch.status != DispatchStatus::Planned
            || progress.open_rotations > 0
            || progress.completed_rotations > 0
        {
            return Err(ApiError::InvalidState(format!(
                "dispatch {} is {} with {} open and {} completed rotations, it cannot be cancelled",
                dispatch_id, dispatch.status, progress.open_rotations, progress.completed_rotations
            )));
        }

        let now = chrono::Local::now().naive_local();
        if DispatchRepository::mark_cancelled_tx(&tx, dispatch_id, &now)? == 0 {
            return Err(ApiError::InvalidState(format!(
                "dispatch {} changed while being cancelled",
                dispatch_id
            )));
        }

        let open_lines =
            ShipmentRepository::count_open_cargo_lines_tx(&tx, &dispatch.shipment_id, rules.tolerance)?;
        if open_lines > 0 {
            ShipmentRepository::update_status_tx(&tx, &dispatch.shipment_id, ShipmentStatus::Received)?;
        }

        let reason = reason.map(str::trim).filter(|s| !s.is_empty());
        let mut log = ActionLog::new(
            ActionType::CancelDispatch,
            dispatch_id,
            &actor,
            Some(json!({
                "cargo_line_id": dispatch.cargo_line_id,
                "warehouse_id": dispatch.warehouse_id,
                "released_quantity": dispatch.planned_quantity,
            })),
        );
        if let Some(reason) = reason {
            log = log.with_detail(reason);
        }
        ActionLogRepository::insert_tx(&tx, &log)?;

        let updated = DispatchRepository::find_by_id_tx(&tx, dispatch_id)?
            .ok_or_else(|| ApiError::not_found("Dispatch", dispatch_id))?;
        tx.commit()?;

        info!(
            dispatch_id,
            cargo_line_id = %dispatch.cargo_line_id,
            warehouse_id = %dispatch.warehouse_id,
            released = dispatch.planned_quantity,
            actor = %actor,
            "dispatch cancelled"
        );
        Ok(updated)
    }

    // ==========================================
    // Reads
    // ==========================================

    pub fn get_dispatch(&self, dispatch_id: &str) -> ApiResult<Dispatch> {
        self.dispatch_repo
            .find_by_id(dispatch_id)?
            .ok_or_else(|| ApiError::not_found("Dispatch", dispatch_id))
    }

    pub fn list_dispatches_for_cargo_line(&self, cargo_line_id: &str) -> ApiResult<Vec<Dispatch>> {
        Ok(self.dispatch_repo.list_by_cargo_line(cargo_line_id)?)
    }

    pub fn list_dispatches_for_warehouse(&self, warehouse_id: &str) -> ApiResult<Vec<Dispatch>> {
        Ok(self.dispatch_repo.list_by_warehouse(warehouse_id)?)
    }

    /// Declared vs allocated vs received for one cargo line
    pub fn cargo_line_balance(&self, cargo_line_id: &str) -> ApiResult<CargoLineBalance> {
        self.report_repo
            .cargo_line_balance(cargo_line_id)?
            .ok_or_else(|| ApiError::not_found("CargoLine", cargo_line_id))
    }
}
