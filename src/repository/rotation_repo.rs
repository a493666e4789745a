// ==========================================
// ITS Stock Ledger - rotation repository
// ==========================================
// Status updates are guarded by the expected current status in the WHERE
// clause; a zero row count means the rotation moved meanwhile.
// ==========================================

use crate::domain::report::{DispatchProgress, RotationFilter};
use crate::domain::rotation::Rotation;
use crate::domain::types::RotationStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_date, format_ts, get_enum, get_opt_ts, get_ts};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT r.rotation_id, r.dispatch_id, r.sequence_no, r.planned_quantity,
           r.delivered_quantity, r.status, r.driver_name, r.truck_number,
           r.observations, r.received_by, r.created_at, r.departed_at,
           r.completed_at, r.updated_at
    FROM rotation r
"#;

/// Values written when a rotation is closed on arrival
#[derive(Debug, Clone)]
pub struct RotationCompletion<'a> {
    pub delivered_quantity: f64,
    pub status: RotationStatus,
    pub observations: Option<&'a str>,
    pub received_by: &'a str,
    pub completed_at: NaiveDateTime,
}

// ==========================================
// RotationRepository
// ==========================================
pub struct RotationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RotationRepository {
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

    pub fn insert_tx(conn: &Connection, rotation: &Rotation) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO rotation (
                rotation_id, dispatch_id, sequence_no, planned_quantity, delivered_quantity,
                status, driver_name, truck_number, observations, received_by,
                created_at, departed_at, completed_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                &rotation.rotation_id,
                &rotation.dispatch_id,
                rotation.sequence_no,
                rotation.planned_quantity,
                rotation.delivered_quantity,
                rotation.status.to_db_str(),
                &rotation.driver_name,
                &rotation.truck_number,
                &rotation.observations,
                &rotation.received_by,
                format_ts(&rotation.created_at),
                rotation.departed_at.as_ref().map(format_ts),
                rotation.completed_at.as_ref().map(format_ts),
                format_ts(&rotation.updated_at),
            ],
        )?;
        Ok(())
    }

    /// PENDING → IN_TRANSIT
    pub fn mark_started_tx(
        conn: &Connection,
        rotation_id: &str,
        departed_at: &NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let ts = format_ts(departed_at);
        let rows = conn.execute(
            r#"
            UPDATE rotation
            SET status = 'IN_TRANSIT', departed_at = ?1, updated_at = ?1
            WHERE rotation_id = ?2 AND status = 'PENDING'
            "#,
            params![ts, rotation_id],
        )?;
        Ok(rows)
    }

    /// IN_TRANSIT → DELIVERED | SHORT_DELIVERED
    pub fn mark_completed_tx(
        conn: &Connection,
        rotation_id: &str,
        completion: &RotationCompletion<'_>,
    ) -> RepositoryResult<usize> {
        let ts = format_ts(&completion.completed_at);
        let rows = conn.execute(
            r#"
            UPDATE rotation
            SET status = ?1,
                delivered_quantity = ?2,
                observations = COALESCE(?3, observations),
                received_by = ?4,
                completed_at = ?5,
                updated_at = ?5
            WHERE rotation_id = ?6 AND status = 'IN_TRANSIT'
            "#,
            params![
                completion.status.to_db_str(),
                completion.delivered_quantity,
                completion.observations,
                completion.received_by,
                ts,
                rotation_id,
            ],
        )?;
        Ok(rows)
    }

    /// PENDING | IN_TRANSIT → CANCELLED
    pub fn mark_cancelled_tx(
        conn: &Connection,
        rotation_id: &str,
        updated_at: &NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE rotation
            SET status = 'CANCELLED', updated_at = ?1
            WHERE rotation_id = ?2 AND status IN ('PENDING', 'IN_TRANSIT')
            "#,
            params![format_ts(updated_at), rotation_id],
        )?;
        Ok(rows)
    }

    // ==========================================
    // Reads usable inside a transaction
    // ==========================================

    pub fn find_by_id_tx(conn: &Connection, rotation_id: &str) -> RepositoryResult<Option<Rotation>> {
        let sql = format!("{} WHERE r.rotation_id = ?", SELECT_COLUMNS);
        let rotation = conn
            .query_row(&sql, params![rotation_id], map_row)
            .optional()?;
        Ok(rotation)
    }

    pub fn list_by_dispatch_tx(conn: &Connection, dispatch_id: &str) -> RepositoryResult<Vec<Rotation>> {
        let sql = format!("{} WHERE r.dispatch_id = ? ORDER BY r.sequence_no", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rotations = stmt
            .query_map(params![dispatch_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rotations)
    }

    /// SUM(planned_quantity) over the non-cancelled rotations of a dispatch
    pub fn sum_active_planned_tx(conn: &Connection, dispatch_id: &str) -> RepositoryResult<f64> {
        let total = conn.query_row(
            r#"
            SELECT COALESCE(SUM(planned_quantity), 0.0)
            FROM rotation
            WHERE dispatch_id = ? AND status <> 'CANCELLED'
            "#,
            params![dispatch_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Rotation counts and received total of one dispatch
    pub fn dispatch_progress_tx(conn: &Connection, dispatch_id: &str) -> RepositoryResult<DispatchProgress> {
        let progress = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status IN ('PENDING', 'IN_TRANSIT') THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status IN ('DELIVERED', 'SHORT_DELIVERED') THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status IN ('DELIVERED', 'SHORT_DELIVERED')
                                  THEN delivered_quantity ELSE 0 END), 0.0)
            FROM rotation
            WHERE dispatch_id = ?
            "#,
            params![dispatch_id],
            |row| {
                Ok(DispatchProgress {
                    open_rotations: row.get(0)?,
                    completed_rotations: row.get(1)?,
                    received_quantity: row.get(2)?,
                })
            },
        )?;
        Ok(progress)
    }

    /// MAX(sequence_no) + 1, cancelled rotations included
    pub fn next_sequence_no_tx(conn: &Connection, dispatch_id: &str) -> RepositoryResult<i32> {
        let max: Option<i32> = conn.query_row(
            "SELECT MAX(sequence_no) FROM rotation WHERE dispatch_id = ?",
            params![dispatch_id],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) + 1)
    }

    // ==========================================
    // Reads
    // ==========================================

    pub fn find_by_id(&self, rotation_id: &str) -> RepositoryResult<Option<Rotation>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, rotation_id)
    }

    pub fn list_by_dispatch(&self, dispatch_id: &str) -> RepositoryResult<Vec<Rotation>> {
        let conn = self.get_conn()?;
        Self::list_by_dispatch_tx(&conn, dispatch_id)
    }

    /// Rotations on the road, optionally for one destination warehouse
    pub fn list_in_transit(&self, warehouse_id: Option<&str>) -> RepositoryResult<Vec<Rotation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
            JOIN dispatch d ON d.dispatch_id = r.dispatch_id
            WHERE r.status = 'IN_TRANSIT'
              AND (?1 IS NULL OR d.warehouse_id = ?1)
            ORDER BY r.departed_at, r.rotation_id
            "#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rotations = stmt
            .query_map(params![warehouse_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rotations)
    }

    /// Rotations matching `filter`, latest movement first
    pub fn list_filtered(&self, filter: &RotationFilter) -> RepositoryResult<Vec<Rotation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
            JOIN dispatch d ON d.dispatch_id = r.dispatch_id
            WHERE (?1 IS NULL OR r.dispatch_id = ?1)
              AND (?2 IS NULL OR d.warehouse_id = ?2)
              AND (?3 IS NULL OR r.status = ?3)
              AND (?4 = 0 OR r.status IN ('DELIVERED', 'SHORT_DELIVERED'))
              AND (?5 IS NULL OR date(COALESCE(r.completed_at, r.departed_at, r.created_at)) >= ?5)
              AND (?6 IS NULL OR date(COALESCE(r.completed_at, r.departed_at, r.created_at)) <= ?6)
            ORDER BY COALESCE(r.completed_at, r.departed_at, r.created_at) DESC,
                     r.dispatch_id, r.sequence_no
            "#,
            SELECT_COLUMNS
        );
        let from = filter.from.as_ref().map(format_date);
        let to = filter.to.as_ref().map(format_date);

        let mut stmt = conn.prepare(&sql)?;
        let rotations = stmt
            .query_map(
                params![
                    filter.dispatch_id.as_deref(),
                    filter.warehouse_id.as_deref(),
                    filter.status.map(|s| s.to_db_str()),
                    filter.received_only,
                    from,
                    to,
                ],
                map_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rotations)
    }
}

fn map_row(row: &Row) -> rusqlite::Result<Rotation> {
    Ok(Rotation {
        rotation_id: row.get(0)?,
        dispatch_id: row.get(1)?,
        sequence_no: row.get(2)?,
        planned_quantity: row.get(3)?,
        delivered_quantity: row.get(4)?,
        status: get_enum(row, 5, RotationStatus::from_db_str)?,
        driver_name: row.get(6)?,
        truck_number: row.get(7)?,
        observations: row.get(8)?,
        received_by: row.get(9)?,
        created_at: get_ts(row, 10)?,
        departed_at: get_opt_ts(row, 11)?,
        completed_at: get_opt_ts(row, 12)?,
        updated_at: get_ts(row, 13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::row_utils::now_ts;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO warehouse (warehouse_id, name, active, created_at)
                VALUES ('W-A', 'Magasin A', 1, '2026-01-01 00:00:00');
            INSERT INTO shipment (shipment_id, vessel_name, port, arrival_date, received_by, created_at)
                VALUES ('s1', 'MV SAHEL', 'Dakar', '2026-01-10', 'agent', '2026-01-10 08:00:00');
            INSERT INTO cargo_line (cargo_line_id, shipment_id, line_no, product_reference,
                                    declared_quantity, unit, created_at)
                VALUES ('c1', 's1', 1, 'RICE', 200, 'tonnes', '2026-01-10 08:00:00');
            INSERT INTO dispatch (dispatch_id, cargo_line_id, shipment_id, warehouse_id,
                                  product_reference, planned_quantity, created_by, created_at, updated_at)
                VALUES ('d1', 'c1', 's1', 'W-A', 'RICE', 100, 'agent',
                        '2026-01-10 09:00:00', '2026-01-10 09:00:00');
            "#,
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn rotation(id: &str, seq: i32, qty: f64) -> Rotation {
        let now = now_ts();
        Rotation {
            rotation_id: id.to_string(),
            dispatch_id: "d1".to_string(),
            sequence_no: seq,
            planned_quantity: qty,
            delivered_quantity: None,
            status: RotationStatus::Pending,
            driver_name: Some("Moussa".to_string()),
            truck_number: Some("DK-1234-A".to_string()),
            observations: None,
            received_by: None,
            created_at: now,
            departed_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    #[test]
    fn test_sequence_and_active_sum() {
        let conn = setup();
        let guard = conn.lock().unwrap();

        assert_eq!(RotationRepository::next_sequence_no_tx(&guard, "d1").unwrap(), 1);
        RotationRepository::insert_tx(&guard, &rotation("r1", 1, 40.0)).unwrap();
        RotationRepository::insert_tx(&guard, &rotation("r2", 2, 30.0)).unwrap();
        assert_eq!(RotationRepository::next_sequence_no_tx(&guard, "d1").unwrap(), 3);
        assert_eq!(RotationRepository::sum_active_planned_tx(&guard, "d1").unwrap(), 70.0);

        assert_eq!(RotationRepository::mark_cancelled_tx(&guard, "r2", &now_ts()).unwrap(), 1);
        assert_eq!(RotationRepository::sum_active_planned_tx(&guard, "d1").unwrap(), 40.0);
        // cancelled sequence numbers are not reused
        assert_eq!(RotationRepository::next_sequence_no_tx(&guard, "d1").unwrap(), 3);
    }

    #[test]
    fn test_status_guards() {
        let conn = setup();
        let repo = RotationRepository::new(conn.clone());

        {
            let guard = conn.lock().unwrap();
            RotationRepository::insert_tx(&guard, &rotation("r1", 1, 40.0)).unwrap();

            let completion = RotationCompletion {
                delivered_quantity: 38.5,
                status: RotationStatus::ShortDelivered,
                observations: Some("sacs déchirés"),
                received_by: "magasinier",
                completed_at: now_ts(),
            };
            // still PENDING: completion does not apply
            assert_eq!(
                RotationRepository::mark_completed_tx(&guard, "r1", &completion).unwrap(),
                0
            );
            assert_eq!(RotationRepository::mark_started_tx(&guard, "r1", &now_ts()).unwrap(), 1);
            assert_eq!(RotationRepository::mark_started_tx(&guard, "r1", &now_ts()).unwrap(), 0);
            assert_eq!(
                RotationRepository::mark_completed_tx(&guard, "r1", &completion).unwrap(),
                1
            );
            assert_eq!(RotationRepository::mark_cancelled_tx(&guard, "r1", &now_ts()).unwrap(), 0);
            assert_eq!(
                RotationRepository::dispatch_progress_tx(&guard, "d1").unwrap(),
                DispatchProgress {
                    open_rotations: 0,
                    completed_rotations: 1,
                    received_quantity: 38.5,
                }
            );
        }

        let stored = repo.find_by_id("r1").unwrap().unwrap();
        assert_eq!(stored.status, RotationStatus::ShortDelivered);
        assert_eq!(stored.delivered_quantity, Some(38.5));
        assert_eq!(stored.observations.as_deref(), Some("sacs déchirés"));
        assert!(stored.departed_at.is_some());
        assert!(stored.completed_at.is_some());
        assert_eq!(stored.shortfall(), Some(1.5));
    }

    #[test]
    fn test_list_in_transit_by_warehouse() {
        let conn = setup();
        let repo = RotationRepository::new(conn.clone());
        {
            let guard = conn.lock().unwrap();
            RotationRepository::insert_tx(&guard, &rotation("r1", 1, 40.0)).unwrap();
            RotationRepository::insert_tx(&guard, &rotation("r2", 2, 40.0)).unwrap();
            RotationRepository::mark_started_tx(&guard, "r2", &now_ts()).unwrap();
        }

        let all = repo.list_in_transit(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].rotation_id, "r2");
        assert_eq!(repo.list_in_transit(Some("W-A")).unwrap().len(), 1);
        assert!(repo.list_in_transit(Some("W-B")).unwrap().is_empty());
        assert_eq!(repo.list_by_dispatch("d1").unwrap().len(), 2);
    }

    #[test]
    fn test_list_filtered() {
        let conn = setup();
        let repo = RotationRepository::new(conn.clone());
        {
            let guard = conn.lock().unwrap();
            let mut old = rotation("r1", 1, 40.0);
            old.created_at = chrono::NaiveDate::from_ymd_opt(2026, 1, 11)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap();
            RotationRepository::insert_tx(&guard, &old).unwrap();
            RotationRepository::insert_tx(&guard, &rotation("r2", 2, 40.0)).unwrap();
            RotationRepository::mark_started_tx(&guard, "r2", &now_ts()).unwrap();
            let completion = RotationCompletion {
                delivered_quantity: 40.0,
                status: RotationStatus::Delivered,
                observations: None,
                received_by: "magasinier",
                completed_at: now_ts(),
            };
            RotationRepository::mark_completed_tx(&guard, "r2", &completion).unwrap();
            RotationRepository::insert_tx(&guard, &rotation("r3", 3, 20.0)).unwrap();
        }

        assert_eq!(repo.list_filtered(&RotationFilter::default()).unwrap().len(), 3);

        let history = repo.list_filtered(&RotationFilter::history(Some("W-A"))).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].rotation_id, "r2");
        assert!(repo.list_filtered(&RotationFilter::history(Some("W-B"))).unwrap().is_empty());

        let pending = repo
            .list_filtered(&RotationFilter {
                status: Some(RotationStatus::Pending),
                ..RotationFilter::default()
            })
            .unwrap();
        let ids: Vec<&str> = pending.iter().map(|r| r.rotation_id.as_str()).collect();
        assert_eq!(ids, vec!["r3", "r1"]);

        let day = chrono::NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        let on_day = repo
            .list_filtered(&RotationFilter {
                from: Some(day),
                to: Some(day),
                ..RotationFilter::default()
            })
            .unwrap();
        assert_eq!(on_day.len(), 1);
        assert_eq!(on_day[0].rotation_id, "r1");
    }
}
