// ==========================================
// ITS Stock Ledger - warehouse repository
// ==========================================

use crate::domain::warehouse::Warehouse;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_ts, get_ts};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "SELECT warehouse_id, name, location, active, created_at FROM warehouse";

// ==========================================
// WarehouseRepository
// ==========================================
pub struct WarehouseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WarehouseRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Insert a warehouse (duplicate id → UniqueConstraintViolation)
    pub fn insert_tx(conn: &Connection, warehouse: &Warehouse) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO warehouse (warehouse_id, name, location, active, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
            params![
                &warehouse.warehouse_id,
                &warehouse.name,
                &warehouse.location,
                warehouse.active,
                format_ts(&warehouse.created_at),
            ],
        )?;
        Ok(())
    }

    /// Toggle the active flag; returns the number of rows touched
    pub fn set_active_tx(conn: &Connection, warehouse_id: &str, active: bool) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE warehouse SET active = ? WHERE warehouse_id = ?",
            params![active, warehouse_id],
        )?;
        Ok(rows)
    }

    pub fn find_by_id_tx(conn: &Connection, warehouse_id: &str) -> RepositoryResult<Option<Warehouse>> {
        let sql = format!("{} WHERE warehouse_id = ?", SELECT_COLUMNS);
        let warehouse = conn
            .query_row(&sql, params![warehouse_id], Self::map_row)
            .optional()?;
        Ok(warehouse)
    }

    pub fn find_by_id(&self, warehouse_id: &str) -> RepositoryResult<Option<Warehouse>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, warehouse_id)
    }

    /// All warehouses ordered by id
    pub fn list_all(&self) -> RepositoryResult<Vec<Warehouse>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY warehouse_id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let warehouses = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(warehouses)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Warehouse> {
        Ok(Warehouse {
            warehouse_id: row.get(0)?,
            name: row.get(1)?,
            location: row.get(2)?,
            active: row.get(3)?,
            created_at: get_ts(row, 4)?,
        })
    }
}
