// ==========================================
// ITS Stock Ledger - rotation tracker API
// ==========================================
// Truck trips of a dispatch and their arrival at the warehouse.
// Invariants:
// - SUM(planned_quantity) of non-cancelled rotations <= dispatch planned
// - delivered_quantity <= planned_quantity
// State machine:
//   PENDING → IN_TRANSIT → {DELIVERED | SHORT_DELIVERED}
//   PENDING | IN_TRANSIT → CANCELLED
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::{check_date_range, lock_conn, require_actor};
use crate::config::ConfigManager;
use crate::db::begin_immediate;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::dispatch::Dispatch;
use crate::domain::report::{DispatchRotations, RotationFilter, WarehouseProductTotal};
use crate::domain::rotation::{PlannedRotation, Rotation, RotationDetails, RotationRequest, Truck};
use crate::domain::types::RotationStatus;
use crate::engine::error::RuleViolation;
use crate::engine::{summarize_rotations, RotationEngine, RotationRules};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::dispatch_repo::DispatchRepository;
use crate::repository::report_repo::ReportRepository;
use crate::repository::rotation_repo::{RotationCompletion, RotationRepository};
use crate::repository::warehouse_repo::WarehouseRepository;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn invalid_transition(rotation: &Rotation, to: RotationStatus) -> ApiError {
    ApiError::InvalidStateTransition {
        entity_id: rotation.rotation_id.clone(),
        from: rotation.status.to_db_str().to_string(),
        to: to.to_db_str().to_string(),
    }
}

pub struct RotationApi {
    conn: Arc<Mutex<Connection>>,
    rotation_repo: Arc<RotationRepository>,
    dispatch_repo: Arc<DispatchRepository>,
    warehouse_repo: Arc<WarehouseRepository>,
    report_repo: Arc<ReportRepository>,
    rotation_engine: Arc<RotationEngine<ConfigManager>>,
}

impl RotationApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        rotation_repo: Arc<RotationRepository>,
        dispatch_repo: Arc<DispatchRepository>,
        warehouse_repo: Arc<WarehouseRepository>,
        report_repo: Arc<ReportRepository>,
        rotation_engine: Arc<RotationEngine<ConfigManager>>,
    ) -> Self {
        Self {
            conn,
            rotation_repo,
            dispatch_repo,
            warehouse_repo,
            report_repo,
            rotation_engine,
        }
    }

    // ==========================================
    // Creation
    // ==========================================

    /// Create one PENDING rotation on a dispatch
    ///
    /// `planned_quantity = None` plans everything still unplanned.
    pub fn create_rotation(
        &self,
        dispatch_id: &str,
        planned_quantity: Option<f64>,
        details: RotationDetails,
        actor: &str,
    ) -> ApiResult<Rotation> {
        let actor = require_actor(actor)?;
        let rules = self.rotation_engine.rules()?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;

        let dispatch = load_open_dispatch(&tx, dispatch_id)?;
        let already = RotationRepository::sum_active_planned_tx(&tx, dispatch_id)?;
        let quantity = match planned_quantity {
            Some(q) => q,
            None => rules.remaining(dispatch_id, dispatch.planned_quantity, already)?,
        };

        let request = RotationRequest {
            planned_quantity: quantity,
            details,
        };
        let mut created = insert_rotations_tx(&tx, &rules, &dispatch, already, &[request], &actor)?;
        tx.commit()?;

        let rotation = created
            .pop()
            .ok_or_else(|| ApiError::InternalError("no rotation created".to_string()))?;
        info!(
            rotation_id = %rotation.rotation_id,
            dispatch_id,
            sequence_no = rotation.sequence_no,
            planned_quantity = rotation.planned_quantity,
            actor = %actor,
            "rotation created"
        );
        Ok(rotation)
    }

    /// Create several rotations at once; all or nothing
    pub fn create_rotations(
        &self,
        dispatch_id: &str,
        requests: Vec<RotationRequest>,
        actor: &str,
    ) -> ApiResult<Vec<Rotation>> {
        let actor = require_actor(actor)?;
        let rules = self.rotation_engine.rules()?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;

        let dispatch = load_open_dispatch(&tx, dispatch_id)?;
        let already = RotationRepository::sum_active_planned_tx(&tx, dispatch_id)?;
        let created = insert_rotations_tx(&tx, &rules, &dispatch, already, &requests, &actor)?;
        tx.commit()?;

        info!(
            dispatch_id,
            rotations = created.len(),
            planned_total = created.iter().map(|r| r.planned_quantity).sum::<f64>(),
            actor = %actor,
            "rotations created"
        );
        Ok(created)
    }

    /// Split a quantity into truck loads; nothing is written
    pub fn plan_rotations(&self, quantity: f64, trucks: &[Truck]) -> ApiResult<Vec<PlannedRotation>> {
        let planner = self.rotation_engine.planner()?;
        let planned = planner.plan(quantity, trucks)?;
        debug!(quantity, trucks = trucks.len(), loads = planned.len(), "rotations planned");
        Ok(planned)
    }

    // ==========================================
    // State changes
    // ==========================================

    /// PENDING → IN_TRANSIT
    pub fn start_rotation(&self, rotation_id: &str, actor: &str) -> ApiResult<Rotation> {
        let actor = require_actor(actor)?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;

        let rotation = load_rotation(&tx, rotation_id)?;
        if !rotation.status.can_transition_to(RotationStatus::InTransit) {
            return Err(invalid_transition(&rotation, RotationStatus::InTransit));
        }

        let now = chrono::Local::now().naive_local();
        if RotationRepository::mark_started_tx(&tx, rotation_id, &now)? == 0 {
            return Err(invalid_transition(&rotation, RotationStatus::InTransit));
        }
        ActionLogRepository::insert_tx(
            &tx,
            &ActionLog::new(ActionType::StartRotation, rotation_id, &actor, None),
        )?;
        let updated = load_rotation(&tx, rotation_id)?;
        tx.commit()?;

        info!(rotation_id, dispatch_id = %updated.dispatch_id, actor = %actor, "rotation departed");
        Ok(updated)
    }

    /// IN_TRANSIT → DELIVERED | SHORT_DELIVERED, then settle the dispatch
    ///
    /// # Errors
    /// - validation: status not a completion status, negative quantity,
    ///   DELIVERED with less than planned
    /// - invalid state: rotation not IN_TRANSIT
    /// - invariant: `DeliveredExceedsPlanned`
    pub fn complete_rotation(
        &self,
        rotation_id: &str,
        delivered_quantity: f64,
        status: RotationStatus,
        observations: Option<&str>,
        actor: &str,
    ) -> ApiResult<Rotation> {
        let actor = require_actor(actor)?;
        if !status.is_received() {
            return Err(RuleViolation::InvalidCompletionStatus { status }.into());
        }
        let rules = self.rotation_engine.rules()?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;

        let rotation = load_rotation(&tx, rotation_id)?;
        if !rotation.status.can_transition_to(status) {
            return Err(invalid_transition(&rotation, status));
        }
        if let Err(violation) = rules.validate_completion(&rotation, delivered_quantity, status) {
            if violation.is_invariant() {
                warn!(
                    rotation_id,
                    planned = rotation.planned_quantity,
                    delivered = delivered_quantity,
                    "completion rejected: {}",
                    violation
                );
            }
            return Err(violation.into());
        }

        let now = chrono::Local::now().naive_local();
        let observations = observations.map(str::trim).filter(|s| !s.is_empty());
        let completion = RotationCompletion {
            delivered_quantity,
            status,
            observations,
            received_by: &actor,
            completed_at: now,
        };
        if RotationRepository::mark_completed_tx(&tx, rotation_id, &completion)? == 0 {
            return Err(invalid_transition(&rotation, status));
        }

        let shortfall = rotation.planned_quantity - delivered_quantity;
        ActionLogRepository::insert_tx(
            &tx,
            &ActionLog::new(
                ActionType::CompleteRotation,
                rotation_id,
                &actor,
                Some(json!({
                    "status": status.to_db_str(),
                    "planned_quantity": rotation.planned_quantity,
                    "delivered_quantity": delivered_quantity,
                    "shortfall": shortfall,
                })),
            ),
        )?;
        settle_dispatch_tx(&tx, &rules, &rotation.dispatch_id, &now)?;
        let updated = load_rotation(&tx, rotation_id)?;
        tx.commit()?;

        info!(
            rotation_id,
            dispatch_id = %rotation.dispatch_id,
            status = %status,
            planned = rotation.planned_quantity,
            delivered = delivered_quantity,
            shortfall,
            actor = %actor,
            "rotation completed"
        );
        Ok(updated)
    }

    /// PENDING | IN_TRANSIT → CANCELLED; the quantity becomes plannable again
    pub fn cancel_rotation(&self, rotation_id: &str, actor: &str) -> ApiResult<Rotation> {
        let actor = require_actor(actor)?;
        let rules = self.rotation_engine.rules()?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;

        let rotation = load_rotation(&tx, rotation_id)?;
        if !rotation.status.can_transition_to(RotationStatus::Cancelled) {
            return Err(invalid_transition(&rotation, RotationStatus::Cancelled));
        }

        let now = chrono::Local::now().naive_local();
        if RotationRepository::mark_cancelled_tx(&tx, rotation_id, &now)? == 0 {
            return Err(invalid_transition(&rotation, RotationStatus::Cancelled));
        }
        ActionLogRepository::insert_tx(
            &tx,
            &ActionLog::new(
                ActionType::CancelRotation,
                rotation_id,
                &actor,
                Some(json!({
                    "previous_status": rotation.status.to_db_str(),
                    "planned_quantity": rotation.planned_quantity,
                })),
            ),
        )?;
        settle_dispatch_tx(&tx, &rules, &rotation.dispatch_id, &now)?;
        let updated = load_rotation(&tx, rotation_id)?;
        tx.commit()?;

        info!(
            rotation_id,
            dispatch_id = %rotation.dispatch_id,
            released = rotation.planned_quantity,
            actor = %actor,
            "rotation cancelled"
        );
        Ok(updated)
    }

    // ==========================================
    // Reads
    // ==========================================

    pub fn get_rotation(&self, rotation_id: &str) -> ApiResult<Rotation> {
        self.rotation_repo
            .find_by_id(rotation_id)?
            .ok_or_else(|| ApiError::not_found("Rotation", rotation_id))
    }

    /// Rotations of a dispatch ordered by sequence_no, with a status summary
    pub fn list_rotations_for_dispatch(&self, dispatch_id: &str) -> ApiResult<DispatchRotations> {
        if self.dispatch_repo.find_by_id(dispatch_id)?.is_none() {
            return Err(ApiError::not_found("Dispatch", dispatch_id));
        }
        let rotations = self.rotation_repo.list_by_dispatch(dispatch_id)?;
        let summary = summarize_rotations(&rotations);
        Ok(DispatchRotations {
            dispatch_id: dispatch_id.to_string(),
            rotations,
            summary,
        })
    }

    pub fn list_in_transit(&self, warehouse_id: Option<&str>) -> ApiResult<Vec<Rotation>> {
        Ok(self.rotation_repo.list_in_transit(warehouse_id)?)
    }

    /// Rotations by dispatch, warehouse, status and movement date
    ///
    /// `RotationFilter::history` gives the delivery history.
    pub fn list_rotations(&self, filter: &RotationFilter) -> ApiResult<Vec<Rotation>> {
        check_date_range(filter.from, filter.to)?;
        let rotations = self.rotation_repo.list_filtered(filter)?;
        debug!(rotations = rotations.len(), "rotations listed");
        Ok(rotations)
    }

    /// Per-product totals of one warehouse, recomputed from rotations
    pub fn get_warehouse_totals(&self, warehouse_id: &str) -> ApiResult<Vec<WarehouseProductTotal>> {
        if self.warehouse_repo.find_by_id(warehouse_id)?.is_none() {
            return Err(ApiError::not_found("Warehouse", warehouse_id));
        }
        let totals = self.report_repo.warehouse_totals(warehouse_id)?;
        debug!(warehouse_id, products = totals.len(), "warehouse totals computed");
        Ok(totals)
    }
}

// ==========================================
// Transaction helpers
// ==========================================

fn load_rotation(conn: &Connection, rotation_id: &str) -> ApiResult<Rotation> {
    RotationRepository::find_by_id_tx(conn, rotation_id)?
        .ok_or_else(|| ApiError::not_found("Rotation", rotation_id))
}

/// Dispatch that still accepts rotations
fn load_open_dispatch(conn: &Connection, dispatch_id: &str) -> ApiResult<Dispatch> {
    let dispatch = DispatchRepository::find_by_id_tx(conn, dispatch_id)?
        .ok_or_else(|| ApiError::not_found("Dispatch", dispatch_id))?;
    if !dispatch.status.accepts_rotations() {
        return Err(ApiError::InvalidState(format!(
            "dispatch {} is {}, no rotation can be added",
            dispatch_id, dispatch.status
        )));
    }
    Ok(dispatch)
}

/// Check and insert new PENDING rotations, then move the dispatch to
/// IN_PROGRESS
fn insert_rotations_tx(
    conn: &Connection,
    rules: &RotationRules,
    dispatch: &Dispatch,
    already_planned: f64,
    requests: &[RotationRequest],
    actor: &str,
) -> ApiResult<Vec<Rotation>> {
    if let Err(violation) = rules.check_new_rotations(
        &dispatch.dispatch_id,
        dispatch.planned_quantity,
        already_planned,
        requests,
    ) {
        if violation.is_invariant() {
            warn!(
                dispatch_id = %dispatch.dispatch_id,
                dispatch_planned = dispatch.planned_quantity,
                already_planned,
                "rotation rejected: {}",
                violation
            );
        }
        return Err(violation.into());
    }

    let now = chrono::Local::now().naive_local();
    let mut sequence_no = RotationRepository::next_sequence_no_tx(conn, &dispatch.dispatch_id)?;
    let mut created = Vec::with_capacity(requests.len());

    for request in requests {
        let details = request.details.clone();
        let rotation = Rotation {
            rotation_id: Uuid::new_v4().to_string(),
            dispatch_id: dispatch.dispatch_id.clone(),
            sequence_no,
            planned_quantity: request.planned_quantity,
            delivered_quantity: None,
            status: RotationStatus::Pending,
            driver_name: trimmed(details.driver_name),
            truck_number: trimmed(details.truck_number),
            observations: trimmed(details.observations),
            received_by: None,
            created_at: now,
            departed_at: None,
            completed_at: None,
            updated_at: now,
        };
        RotationRepository::insert_tx(conn, &rotation)?;
        ActionLogRepository::insert_tx(
            conn,
            &ActionLog::new(
                ActionType::CreateRotation,
                &rotation.rotation_id,
                actor,
                Some(json!({
                    "dispatch_id": rotation.dispatch_id,
                    "sequence_no": rotation.sequence_no,
                    "planned_quantity": rotation.planned_quantity,
                    "truck_number": rotation.truck_number,
                    "driver_name": rotation.driver_name,
                })),
            ),
        )?;
        sequence_no += 1;
        created.push(rotation);
    }

    settle_dispatch_tx(conn, rules, &dispatch.dispatch_id, &now)?;
    Ok(created)
}

/// Re-derive the dispatch status from its rotations
fn settle_dispatch_tx(
    conn: &Connection,
    rules: &RotationRules,
    dispatch_id: &str,
    now: &NaiveDateTime,
) -> ApiResult<()> {
    let dispatch = DispatchRepository::find_by_id_tx(conn, dispatch_id)?
        .ok_or_else(|| ApiError::not_found("Dispatch", dispatch_id))?;
    let progress = RotationRepository::dispatch_progress_tx(conn, dispatch_id)?;
    let status = rules.derive_dispatch_status(dispatch.planned_quantity, &progress);

    if status != dispatch.status {
        DispatchRepository::update_status_tx(conn, dispatch_id, status, now)?;
        debug!(
            dispatch_id,
            from = %dispatch.status,
            to = %status,
            received = progress.received_quantity,
            "dispatch status changed"
        );
    }
    Ok(())
}
