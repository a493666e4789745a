// ==========================================
// ITS Stock Ledger - dispatch repository
// ==========================================

use crate::domain::dispatch::Dispatch;
use crate::domain::types::DispatchStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_ts, get_enum, get_ts};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT dispatch_id, cargo_line_id, shipment_id, warehouse_id, product_reference,
           planned_quantity, status, created_by, created_at, updated_at
    FROM dispatch
"#;

// ==========================================
// DispatchRepository
// ==========================================
pub struct DispatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DispatchRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // Writes (inside the caller's transaction)
    // ==========================================

    pub fn batch_insert_tx(conn: &Connection, dispatches: &[Dispatch]) -> RepositoryResult<usize> {
        let mut stmt = conn.prepare(
            r#"
            INSERT INTO dispatch (
                dispatch_id, cargo_line_id, shipment_id, warehouse_id, product_reference,
                planned_quantity, status, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )?;

        let mut count = 0;
        for d in dispatches {
            stmt.execute(params![
                &d.dispatch_id,
                &d.cargo_line_id,
                &d.shipment_id,
                &d.warehouse_id,
                &d.product_reference,
                d.planned_quantity,
                d.status.to_db_str(),
                &d.created_by,
                format_ts(&d.created_at),
                format_ts(&d.updated_at),
            ])?;
            count += 1;
        }
        Ok(count)
    }

    pub fn update_status_tx(
        conn: &Connection,
        dispatch_id: &str,
        status: DispatchStatus,
        updated_at: &NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE dispatch SET status = ?, updated_at = ? WHERE dispatch_id = ?",
            params![status.to_db_str(), format_ts(updated_at), dispatch_id],
        )?;
        Ok(rows)
    }

    // ==========================================
    // Reads usable inside a transaction
    // ==========================================

    pub fn find_by_id_tx(conn: &Connection, dispatch_id: &str) -> RepositoryResult<Option<Dispatch>> {
        let sql = format!("{} WHERE dispatch_id = ?", SELECT_COLUMNS);
        let dispatch = conn
            .query_row(&sql, params![dispatch_id], map_row)
            .optional()?;
        Ok(dispatch)
    }

    /// PLANNED → CANCELLED; zero rows when the dispatch moved meanwhile
    pub fn mark_cancelled_tx(
        conn: &Connection,
        dispatch_id: &str,
        updated_at: &NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE dispatch
            SET status = 'CANCELLED', updated_at = ?1
            WHERE dispatch_id = ?2 AND status = 'PLANNED'
            "#,
            params![format_ts(updated_at), dispatch_id],
        )?;
        Ok(rows)
    }

    /// SUM(planned_quantity) over the live (non-cancelled) dispatches of one cargo line
    pub fn sum_planned_for_cargo_line_tx(conn: &Connection, cargo_line_id: &str) -> RepositoryResult<f64> {
        let total = conn.query_row(
            r#"
            SELECT COALESCE(SUM(planned_quantity), 0.0)
            FROM dispatch
            WHERE cargo_line_id = ? AND status <> 'CANCELLED'
            "#,
            params![cargo_line_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn list_by_cargo_line_tx(conn: &Connection, cargo_line_id: &str) -> RepositoryResult<Vec<Dispatch>> {
        let sql = format!(
            "{} WHERE cargo_line_id = ? ORDER BY created_at, warehouse_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let dispatches = stmt
            .query_map(params![cargo_line_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dispatches)
    }

    // ==========================================
    // Reads
    // ==========================================

    pub fn find_by_id(&self, dispatch_id: &str) -> RepositoryResult<Option<Dispatch>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, dispatch_id)
    }

    pub fn list_by_cargo_line(&self, cargo_line_id: &str) -> RepositoryResult<Vec<Dispatch>> {
        let conn = self.get_conn()?;
        Self::list_by_cargo_line_tx(&conn, cargo_line_id)
    }

    pub fn list_by_warehouse(&self, warehouse_id: &str) -> RepositoryResult<Vec<Dispatch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE warehouse_id = ? ORDER BY created_at DESC, dispatch_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let dispatches = stmt
            .query_map(params![warehouse_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dispatches)
    }

    pub fn sum_planned_for_cargo_line(&self, cargo_line_id: &str) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;
        Self::sum_planned_for_cargo_line_tx(&conn, cargo_line_id)
    }
}

fn map_row(row: &Row) -> rusqlite::Result<Dispatch> {
    Ok(Dispatch {
        dispatch_id: row.get(0)?,
        cargo_line_id: row.get(1)?,
        shipment_id: row.get(2)?,
        warehouse_id: row.get(3)?,
        product_reference: row.get(4)?,
        planned_quantity: row.get(5)?,
        status: get_enum(row, 6, DispatchStatus::from_db_str)?,
        created_by: row.get(7)?,
        created_at: get_ts(row, 8)?,
        updated_at: get_ts(row, 9)?,
    })
}
