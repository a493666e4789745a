// ==========================================
// ITS Stock Ledger - read-model queries
// ==========================================
// Every figure here is aggregated from rotation / dispatch rows on each
// call. Nothing is cached or stored.
// ==========================================

use crate::domain::report::{
    CargoLineBalance, DiscrepancyFilter, DiscrepancyLine, DispatchAggregate, PeriodFilter,
    WarehouseProductTotal, WarehouseStockRow,
};
use crate::domain::types::DispatchStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_date, get_enum, get_opt_ts};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// ReportRepository
// ==========================================
pub struct ReportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReportRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Per-product totals of one warehouse
    ///
    /// Only non-cancelled rotations are counted. Products with no rotation
    /// yet do not appear.
    pub fn warehouse_totals(&self, warehouse_id: &str) -> RepositoryResult<Vec<WarehouseProductTotal>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                d.warehouse_id,
                d.product_reference,
                COUNT(r.rotation_id),
                COALESCE(SUM(r.planned_quantity), 0.0),
                COALESCE(SUM(CASE WHEN r.status = 'DELIVERED'
                                  THEN r.delivered_quantity ELSE 0 END), 0.0),
                COALESCE(SUM(CASE WHEN r.status = 'SHORT_DELIVERED'
                                  THEN r.delivered_quantity ELSE 0 END), 0.0),
                COALESCE(SUM(CASE WHEN r.status IN ('DELIVERED', 'SHORT_DELIVERED')
                                  THEN r.planned_quantity - r.delivered_quantity ELSE 0 END), 0.0)
            FROM rotation r
            JOIN dispatch d ON d.dispatch_id = r.dispatch_id
            WHERE d.warehouse_id = ?
              AND r.status <> 'CANCELLED'
            GROUP BY d.warehouse_id, d.product_reference
            ORDER BY d.product_reference
            "#,
        )?;

        let totals = stmt
            .query_map(params![warehouse_id], |row| {
                let total_delivered: f64 = row.get(4)?;
                let total_short_delivered: f64 = row.get(5)?;
                Ok(WarehouseProductTotal {
                    warehouse_id: row.get(0)?,
                    product_reference: row.get(1)?,
                    rotation_count: row.get(2)?,
                    total_planned: row.get(3)?,
                    total_delivered,
                    total_short_delivered,
                    total_received: total_delivered + total_short_delivered,
                    total_shortfall: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(totals)
    }

    /// Received quantity per (warehouse, product) across every warehouse
    pub fn stock_overview(&self) -> RepositoryResult<Vec<WarehouseStockRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT w.warehouse_id, w.name, d.product_reference,
                   COALESCE(SUM(r.delivered_quantity), 0.0)
            FROM rotation r
            JOIN dispatch d ON d.dispatch_id = r.dispatch_id
            JOIN warehouse w ON w.warehouse_id = d.warehouse_id
            WHERE r.status IN ('DELIVERED', 'SHORT_DELIVERED')
            GROUP BY w.warehouse_id, w.name, d.product_reference
            ORDER BY w.warehouse_id, d.product_reference
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(WarehouseStockRow {
                    warehouse_id: row.get(0)?,
                    warehouse_name: row.get(1)?,
                    product_reference: row.get(2)?,
                    total_received: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Planned / scheduled / received figures per live dispatch
    pub fn dispatch_aggregates(&self, warehouse_id: Option<&str>) -> RepositoryResult<Vec<DispatchAggregate>> {
        let conn = self.get_conn()?;
        query_dispatch_aggregates(&conn, warehouse_id, &PeriodFilter::default())
    }

    /// Same figures for the dispatches created within `period`
    pub fn dispatch_aggregates_in_period(&self, period: &PeriodFilter) -> RepositoryResult<Vec<DispatchAggregate>> {
        let conn = self.get_conn()?;
        query_dispatch_aggregates(&conn, None, period)
    }

    /// Completed rotations whose shortfall exceeds `tolerance`
    ///
    /// `from` / `to` filter on the completion date (inclusive).
    pub fn discrepancy_lines(
        &self,
        filter: &DiscrepancyFilter,
        tolerance: f64,
    ) -> RepositoryResult<Vec<DiscrepancyLine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT r.rotation_id, r.dispatch_id, r.sequence_no, d.warehouse_id,
                   d.product_reference, r.driver_name, r.truck_number,
                   r.planned_quantity, r.delivered_quantity,
                   r.planned_quantity - r.delivered_quantity, r.completed_at
            FROM rotation r
            JOIN dispatch d ON d.dispatch_id = r.dispatch_id
            WHERE r.status IN ('DELIVERED', 'SHORT_DELIVERED')
              AND r.planned_quantity - r.delivered_quantity > ?1
              AND (?2 IS NULL OR d.warehouse_id = ?2)
              AND (?3 IS NULL OR date(r.completed_at) >= ?3)
              AND (?4 IS NULL OR date(r.completed_at) <= ?4)
            ORDER BY r.completed_at DESC, r.rotation_id
            "#,
        )?;

        let from = filter.from.as_ref().map(format_date);
        let to = filter.to.as_ref().map(format_date);

        let lines = stmt
            .query_map(
                params![tolerance, filter.warehouse_id.as_deref(), from, to],
                |row| {
                    Ok(DiscrepancyLine {
                        rotation_id: row.get(0)?,
                        dispatch_id: row.get(1)?,
                        sequence_no: row.get(2)?,
                        warehouse_id: row.get(3)?,
                        product_reference: row.get(4)?,
                        driver_name: row.get(5)?,
                        truck_number: row.get(6)?,
                        planned_quantity: row.get(7)?,
                        delivered_quantity: row.get(8)?,
                        shortfall: row.get(9)?,
                        completed_at: get_opt_ts(row, 10)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// Declared / allocated / received figures of one cargo line
    pub fn cargo_line_balance(&self, cargo_line_id: &str) -> RepositoryResult<Option<CargoLineBalance>> {
        let conn = self.get_conn()?;
        let balance = conn
            .query_row(
                r#"
                SELECT
                    c.cargo_line_id,
                    c.product_reference,
                    c.declared_quantity,
                    (SELECT COALESCE(SUM(d.planned_quantity), 0.0)
                     FROM dispatch d
                     WHERE d.cargo_line_id = c.cargo_line_id AND d.status <> 'CANCELLED'),
                    (SELECT COALESCE(SUM(r.delivered_quantity), 0.0)
                     FROM rotation r
                     JOIN dispatch d ON d.dispatch_id = r.dispatch_id
                     WHERE d.cargo_line_id = c.cargo_line_id
                       AND r.status IN ('DELIVERED', 'SHORT_DELIVERED'))
                FROM cargo_line c
                WHERE c.cargo_line_id = ?
                "#,
                params![cargo_line_id],
                |row| {
                    let declared: f64 = row.get(2)?;
                    let allocated: f64 = row.get(3)?;
                    Ok(CargoLineBalance {
                        cargo_line_id: row.get(0)?,
                        product_reference: row.get(1)?,
                        declared_quantity: declared,
                        allocated_quantity: allocated,
                        unallocated_quantity: declared - allocated,
                        received_quantity: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(balance)
    }
}

fn query_dispatch_aggregates(
    conn: &Connection,
    warehouse_id: Option<&str>,
    period: &PeriodFilter,
) -> RepositoryResult<Vec<DispatchAggregate>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT
            d.dispatch_id,
            d.warehouse_id,
            d.product_reference,
            d.status,
            d.planned_quantity,
            COALESCE(SUM(CASE WHEN r.status <> 'CANCELLED'
                              THEN r.planned_quantity ELSE 0 END), 0.0),
            COALESCE(SUM(CASE WHEN r.status IN ('DELIVERED', 'SHORT_DELIVERED')
                              THEN r.delivered_quantity ELSE 0 END), 0.0),
            COALESCE(SUM(CASE WHEN r.status IN ('PENDING', 'IN_TRANSIT')
                              THEN 1 ELSE 0 END), 0)
        FROM dispatch d
        LEFT JOIN rotation r ON r.dispatch_id = d.dispatch_id
        WHERE d.status <> 'CANCELLED'
          AND (?1 IS NULL OR d.warehouse_id = ?1)
          AND (?2 IS NULL OR date(d.created_at) >= ?2)
          AND (?3 IS NULL OR date(d.created_at) <= ?3)
        GROUP BY d.dispatch_id
        ORDER BY d.warehouse_id, d.created_at, d.dispatch_id
        "#,
    )?;
    let from = period.from.as_ref().map(format_date);
    let to = period.to.as_ref().map(format_date);

    let rows = stmt
        .query_map(params![warehouse_id, from, to], |row| {
            Ok(DispatchAggregate {
                dispatch_id: row.get(0)?,
                warehouse_id: row.get(1)?,
                product_reference: row.get(2)?,
                dispatch_status: get_enum(row, 3, DispatchStatus::from_db_str)?,
                planned_quantity: row.get(4)?,
                scheduled_quantity: row.get(5)?,
                received_quantity: row.get(6)?,
                open_rotations: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // Two warehouses, one cargo line of 200 t split 120 / 80,
    // rotations in every status on the W-A dispatch.
    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO warehouse (warehouse_id, name, active, created_at) VALUES
                ('W-A', 'Magasin A', 1, '2026-01-01 00:00:00'),
                ('W-B', 'Magasin B', 1, '2026-01-01 00:00:00');
            INSERT INTO shipment (shipment_id, vessel_name, port, arrival_date, received_by, created_at)
                VALUES ('s1', 'MV SAHEL', 'Dakar', '2026-01-10', 'agent', '2026-01-10 08:00:00');
            INSERT INTO cargo_line (cargo_line_id, shipment_id, line_no, product_reference,
                                    declared_quantity, unit, created_at)
                VALUES ('c1', 's1', 1, 'RICE', 200, 'tonnes', '2026-01-10 08:00:00');
            INSERT INTO dispatch (dispatch_id, cargo_line_id, shipment_id, warehouse_id,
                                  product_reference, planned_quantity, status, created_by,
                                  created_at, updated_at) VALUES
                ('d1', 'c1', 's1', 'W-A', 'RICE', 120, 'IN_PROGRESS', 'agent',
                 '2026-01-10 09:00:00', '2026-01-10 09:00:00'),
                ('d2', 'c1', 's1', 'W-B', 'RICE', 80, 'PLANNED', 'agent',
                 '2026-01-10 09:00:00', '2026-01-10 09:00:00');
            INSERT INTO rotation (rotation_id, dispatch_id, sequence_no, planned_quantity,
                                  delivered_quantity, status, driver_name, created_at,
                                  completed_at, updated_at) VALUES
                ('r1', 'd1', 1, 40, 40, 'DELIVERED', 'Moussa',
                 '2026-01-11 08:00:00', '2026-01-11 12:00:00', '2026-01-11 12:00:00'),
                ('r2', 'd1', 2, 40, 37.5, 'SHORT_DELIVERED', 'Awa',
                 '2026-01-11 08:00:00', '2026-01-12 12:00:00', '2026-01-12 12:00:00'),
                ('r3', 'd1', 3, 20, NULL, 'IN_TRANSIT', 'Moussa',
                 '2026-01-11 08:00:00', NULL, '2026-01-11 08:00:00'),
                ('r4', 'd1', 4, 20, NULL, 'CANCELLED', 'Ibou',
                 '2026-01-11 08:00:00', NULL, '2026-01-11 08:00:00');
            "#,
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_warehouse_totals_skip_cancelled() {
        let repo = ReportRepository::new(setup());
        let totals = repo.warehouse_totals("W-A").unwrap();
        assert_eq!(totals.len(), 1);

        let t = &totals[0];
        assert_eq!(t.product_reference, "RICE");
        assert_eq!(t.rotation_count, 3);
        assert_eq!(t.total_planned, 100.0);
        assert_eq!(t.total_delivered, 40.0);
        assert_eq!(t.total_short_delivered, 37.5);
        assert_eq!(t.total_received, 77.5);
        assert_eq!(t.total_shortfall, 2.5);

        assert!(repo.warehouse_totals("W-B").unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_aggregates() {
        let repo = ReportRepository::new(setup());
        let rows = repo.dispatch_aggregates(None).unwrap();
        assert_eq!(rows.len(), 2);

        let d1 = rows.iter().find(|r| r.dispatch_id == "d1").unwrap();
        assert_eq!(d1.scheduled_quantity, 100.0);
        assert_eq!(d1.received_quantity, 77.5);
        assert_eq!(d1.open_rotations, 1);

        let d2 = rows.iter().find(|r| r.dispatch_id == "d2").unwrap();
        assert_eq!(d2.scheduled_quantity, 0.0);
        assert_eq!(d2.open_rotations, 0);

        assert_eq!(repo.dispatch_aggregates(Some("W-B")).unwrap().len(), 1);

        let january = PeriodFilter {
            from: Some(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()),
            to: Some(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()),
        };
        assert_eq!(repo.dispatch_aggregates_in_period(&january).unwrap().len(), 2);
        let february = PeriodFilter {
            from: Some(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()),
            to: None,
        };
        assert!(repo.dispatch_aggregates_in_period(&february).unwrap().is_empty());
    }

    #[test]
    fn test_cancelled_dispatch_is_not_allocated() {
        let conn = setup();
        conn.lock()
            .unwrap()
            .execute("UPDATE dispatch SET status = 'CANCELLED' WHERE dispatch_id = 'd2'", [])
            .unwrap();
        let repo = ReportRepository::new(conn);

        let balance = repo.cargo_line_balance("c1").unwrap().unwrap();
        assert_eq!(balance.allocated_quantity, 120.0);
        assert_eq!(balance.unallocated_quantity, 80.0);
        assert_eq!(repo.dispatch_aggregates(None).unwrap().len(), 1);
    }

    #[test]
    fn test_discrepancy_lines_and_date_filter() {
        let repo = ReportRepository::new(setup());

        let lines = repo
            .discrepancy_lines(&DiscrepancyFilter::default(), 1e-6)
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].rotation_id, "r2");
        assert_eq!(lines[0].shortfall, 2.5);
        assert_eq!(lines[0].driver_name.as_deref(), Some("Awa"));

        let filter = DiscrepancyFilter {
            warehouse_id: None,
            from: Some(NaiveDate::from_ymd_opt(2026, 1, 13).unwrap()),
            to: None,
        };
        assert!(repo.discrepancy_lines(&filter, 1e-6).unwrap().is_empty());
    }

    #[test]
    fn test_balance_and_overview() {
        let repo = ReportRepository::new(setup());

        let balance = repo.cargo_line_balance("c1").unwrap().unwrap();
        assert_eq!(balance.allocated_quantity, 200.0);
        assert_eq!(balance.unallocated_quantity, 0.0);
        assert_eq!(balance.received_quantity, 77.5);
        assert!(repo.cargo_line_balance("missing").unwrap().is_none());

        let overview = repo.stock_overview().unwrap();
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].warehouse_name, "Magasin A");
        assert_eq!(overview[0].total_received, 77.5);
    }
}
