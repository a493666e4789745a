// ==========================================
// ITS Stock Ledger - warehouse registry API
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::{lock_conn, require_actor};
use crate::db::begin_immediate;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::warehouse::Warehouse;
use crate::engine::quantity::ensure_not_blank;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::warehouse_repo::WarehouseRepository;
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct WarehouseApi {
    conn: Arc<Mutex<Connection>>,
    warehouse_repo: Arc<WarehouseRepository>,
}

impl WarehouseApi {
    pub fn new(conn: Arc<Mutex<Connection>>, warehouse_repo: Arc<WarehouseRepository>) -> Self {
        Self {
            conn,
            warehouse_repo,
        }
    }

    /// Register a destination warehouse (active on creation)
    ///
    /// # Errors
    /// - validation: blank id or name, id already registered
    pub fn register_warehouse(
        &self,
        warehouse_id: &str,
        name: &str,
        location: Option<&str>,
        actor: &str,
    ) -> ApiResult<Warehouse> {
        let actor = require_actor(actor)?;
        let warehouse = Warehouse {
            warehouse_id: ensure_not_blank("warehouse_id", warehouse_id)?,
            name: ensure_not_blank("name", name)?,
            location: location
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            active: true,
            created_at: chrono::Local::now().naive_local(),
        };

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;
        if WarehouseRepository::find_by_id_tx(&tx, &warehouse.warehouse_id)?.is_some() {
            return Err(ApiError::InvalidInput(format!(
                "warehouse {} is already registered",
                warehouse.warehouse_id
            )));
        }
        WarehouseRepository::insert_tx(&tx, &warehouse)?;
        ActionLogRepository::insert_tx(
            &tx,
            &ActionLog::new(
                ActionType::RegisterWarehouse,
                &warehouse.warehouse_id,
                &actor,
                Some(json!({ "name": warehouse.name, "location": warehouse.location })),
            ),
        )?;
        tx.commit()?;

        info!(warehouse_id = %warehouse.warehouse_id, name = %warehouse.name, actor = %actor, "warehouse registered");
        Ok(warehouse)
    }

    /// Inactive warehouses keep their history but take no new dispatch
    pub fn set_warehouse_active(&self, warehouse_id: &str, active: bool, actor: &str) -> ApiResult<Warehouse> {
        let actor = require_actor(actor)?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;
        if WarehouseRepository::set_active_tx(&tx, warehouse_id, active)? == 0 {
            return Err(ApiError::not_found("Warehouse", warehouse_id));
        }
        ActionLogRepository::insert_tx(
            &tx,
            &ActionLog::new(
                ActionType::UpdateWarehouse,
                warehouse_id,
                &actor,
                Some(json!({ "active": active })),
            ),
        )?;
        let warehouse = WarehouseRepository::find_by_id_tx(&tx, warehouse_id)?
            .ok_or_else(|| ApiError::not_found("Warehouse", warehouse_id))?;
        tx.commit()?;

        info!(warehouse_id, active, actor = %actor, "warehouse updated");
        Ok(warehouse)
    }

    pub fn get_warehouse(&self, warehouse_id: &str) -> ApiResult<Warehouse> {
        self.warehouse_repo
            .find_by_id(warehouse_id)?
            .ok_or_else(|| ApiError::not_found("Warehouse", warehouse_id))
    }

    pub fn list_warehouses(&self) -> ApiResult<Vec<Warehouse>> {
        Ok(self.warehouse_repo.list_all()?)
    }
}
