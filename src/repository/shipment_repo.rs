// ==========================================
// ITS Stock Ledger - shipment and cargo line repository
// ==========================================
// Cargo lines are insert-only; no update statement exists for them.
// ==========================================

use crate::domain::shipment::{CargoLine, Shipment};
use crate::domain::types::ShipmentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_date, format_ts, get_date, get_enum, get_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SHIPMENT_COLUMNS: &str = r#"
    SELECT shipment_id, vessel_name, imo_number, flag, port, arrival_date,
           bill_of_lading, maritime_agent, status, received_by, observations, created_at
    FROM shipment
"#;

const CARGO_LINE_COLUMNS: &str = r#"
    SELECT cargo_line_id, shipment_id, line_no, product_reference,
           declared_quantity, unit, origin, created_at
    FROM cargo_line
"#;

// ==========================================
// ShipmentRepository
// ==========================================
pub struct ShipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShipmentRepository {
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

    pub fn insert_shipment_tx(conn: &Connection, shipment: &Shipment) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO shipment (
                shipment_id, vessel_name, imo_number, flag, port, arrival_date,
                bill_of_lading, maritime_agent, status, received_by, observations, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                &shipment.shipment_id,
                &shipment.vessel_name,
                &shipment.imo_number,
                &shipment.flag,
                &shipment.port,
                format_date(&shipment.arrival_date),
                &shipment.bill_of_lading,
                &shipment.maritime_agent,
                shipment.status.to_db_str(),
                &shipment.received_by,
                &shipment.observations,
                format_ts(&shipment.created_at),
            ],
        )?;
        Ok(())
    }

    /// Batch insert cargo lines with a prepared statement
    pub fn insert_cargo_lines_tx(conn: &Connection, lines: &[CargoLine]) -> RepositoryResult<usize> {
        let mut stmt = conn.prepare(
            r#"
            INSERT INTO cargo_line (
                cargo_line_id, shipment_id, line_no, product_reference,
                declared_quantity, unit, origin, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )?;

        let mut count = 0;
        for line in lines {
            stmt.execute(params![
                &line.cargo_line_id,
                &line.shipment_id,
                line.line_no,
                &line.product_reference,
                line.declared_quantity,
                &line.unit,
                &line.origin,
                format_ts(&line.created_at),
            ])?;
            count += 1;
        }
        Ok(count)
    }

    pub fn update_status_tx(
        conn: &Connection,
        shipment_id: &str,
        status: ShipmentStatus,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE shipment SET status = ? WHERE shipment_id = ?",
            params![status.to_db_str(), shipment_id],
        )?;
        Ok(rows)
    }

    // ==========================================
    // Reads usable inside a transaction
    // ==========================================

    pub fn find_shipment_tx(conn: &Connection, shipment_id: &str) -> RepositoryResult<Option<Shipment>> {
        let sql = format!("{} WHERE shipment_id = ?", SHIPMENT_COLUMNS);
        let shipment = conn
            .query_row(&sql, params![shipment_id], map_shipment)
            .optional()?;
        Ok(shipment)
    }

    pub fn find_cargo_line_tx(conn: &Connection, cargo_line_id: &str) -> RepositoryResult<Option<CargoLine>> {
        let sql = format!("{} WHERE cargo_line_id = ?", CARGO_LINE_COLUMNS);
        let line = conn
            .query_row(&sql, params![cargo_line_id], map_cargo_line)
            .optional()?;
        Ok(line)
    }

    pub fn list_cargo_lines_tx(conn: &Connection, shipment_id: &str) -> RepositoryResult<Vec<CargoLine>> {
        let sql = format!("{} WHERE shipment_id = ? ORDER BY line_no", CARGO_LINE_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let lines = stmt
            .query_map(params![shipment_id], map_cargo_line)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// Number of cargo lines of a shipment whose allocated total is still
    /// below the declared quantity (by more than `tolerance`)
    pub fn count_open_cargo_lines_tx(
        conn: &Connection,
        shipment_id: &str,
        tolerance: f64,
    ) -> RepositoryResult<i64> {
        let count = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM cargo_line c
            WHERE c.shipment_id = ?1
              AND c.declared_quantity - (
                    SELECT COALESCE(SUM(d.planned_quantity), 0)
                    FROM dispatch d
                    WHERE d.cargo_line_id = c.cargo_line_id
                      AND d.status <> 'CANCELLED'
                  ) > ?2
            "#,
            params![shipment_id, tolerance],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // Reads
    // ==========================================

    pub fn find_shipment(&self, shipment_id: &str) -> RepositoryResult<Option<Shipment>> {
        let conn = self.get_conn()?;
        Self::find_shipment_tx(&conn, shipment_id)
    }

    pub fn find_cargo_line(&self, cargo_line_id: &str) -> RepositoryResult<Option<CargoLine>> {
        let conn = self.get_conn()?;
        Self::find_cargo_line_tx(&conn, cargo_line_id)
    }

    pub fn list_cargo_lines(&self, shipment_id: &str) -> RepositoryResult<Vec<CargoLine>> {
        let conn = self.get_conn()?;
        Self::list_cargo_lines_tx(&conn, shipment_id)
    }

    /// All shipments, most recent arrival first
    pub fn list_shipments(&self) -> RepositoryResult<Vec<Shipment>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY arrival_date DESC, created_at DESC", SHIPMENT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let shipments = stmt
            .query_map([], map_shipment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(shipments)
    }
}

fn map_shipment(row: &Row) -> rusqlite::Result<Shipment> {
    Ok(Shipment {
        shipment_id: row.get(0)?,
        vessel_name: row.get(1)?,
        imo_number: row.get(2)?,
        flag: row.get(3)?,
        port: row.get(4)?,
        arrival_date: get_date(row, 5)?,
        bill_of_lading: row.get(6)?,
        maritime_agent: row.get(7)?,
        status: get_enum(row, 8, ShipmentStatus::from_db_str)?,
        received_by: row.get(9)?,
        observations: row.get(10)?,
        created_at: get_ts(row, 11)?,
    })
}

fn map_cargo_line(row: &Row) -> rusqlite::Result<CargoLine> {
    Ok(CargoLine {
        cargo_line_id: row.get(0)?,
        shipment_id: row.get(1)?,
        line_no: row.get(2)?,
        product_reference: row.get(3)?,
        declared_quantity: row.get(4)?,
        unit: row.get(5)?,
        origin: row.get(6)?,
        created_at: get_ts(row, 7)?,
    })
}
