// ==========================================
// ITS Stock Ledger - application state
// ==========================================
// Wires one shared SQLite connection into repositories, engines and APIs.
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{DispatchApi, ReportApi, RotationApi, ShipmentApi, WarehouseApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::engine::{AllocationEngine, ReconciliationEngine, RotationEngine};
use crate::repository::{
    ActionLogRepository, DispatchRepository, ReportRepository, RotationRepository,
    ShipmentRepository, WarehouseRepository,
};

/// Environment variable overriding the database location
pub const DB_PATH_ENV: &str = "ITS_LEDGER_DB_PATH";

const DB_FILE_NAME: &str = "its_ledger.db";

/// Application state
///
/// Every API shares the same connection; writes are serialised by the
/// connection mutex inside a process and by BEGIN IMMEDIATE across
/// processes.
pub struct AppState {
    pub db_path: String,

    pub shipment_api: Arc<ShipmentApi>,
    pub dispatch_api: Arc<DispatchApi>,
    pub rotation_api: Arc<RotationApi>,
    pub report_api: Arc<ReportApi>,
    pub warehouse_api: Arc<WarehouseApi>,

    /// Settings (allocation policy, tolerance, defaults)
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// Open (or create) the ledger database and build every API
    ///
    /// # Errors
    /// - the database cannot be opened or its schema cannot be created
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "initialising ledger state");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("cannot open database {}: {}", db_path, e))?;
        init_schema(&conn).map_err(|e| format!("cannot create schema: {}", e))?;
        match read_schema_version(&conn) {
            Ok(Some(v)) if v > CURRENT_SCHEMA_VERSION => {
                tracing::warn!(found = v, expected = CURRENT_SCHEMA_VERSION, "database schema is newer than this build");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("schema_version unreadable: {}", e),
        }
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // Repositories
        // ==========================================
        let shipment_repo = Arc::new(ShipmentRepository::new(conn.clone()));
        let dispatch_repo = Arc::new(DispatchRepository::new(conn.clone()));
        let rotation_repo = Arc::new(RotationRepository::new(conn.clone()));
        let warehouse_repo = Arc::new(WarehouseRepository::new(conn.clone()));
        let report_repo = Arc::new(ReportRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // ==========================================
        // Engines
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("cannot create ConfigManager: {}", e))?,
        );
        let allocation_engine = Arc::new(AllocationEngine::new(config_manager.clone()));
        let rotation_engine = Arc::new(RotationEngine::new(config_manager.clone()));
        let reconciliation_engine = Arc::new(ReconciliationEngine::new(config_manager.clone()));

        // ==========================================
        // APIs
        // ==========================================
        let shipment_api = Arc::new(ShipmentApi::new(
            conn.clone(),
            shipment_repo,
            config_manager.clone(),
        ));
        let dispatch_api = Arc::new(DispatchApi::new(
            conn.clone(),
            dispatch_repo.clone(),
            report_repo.clone(),
            allocation_engine,
        ));
        let rotation_api = Arc::new(RotationApi::new(
            conn.clone(),
            rotation_repo,
            dispatch_repo,
            warehouse_repo.clone(),
            report_repo.clone(),
            rotation_engine,
        ));
        let report_api = Arc::new(ReportApi::new(
            report_repo,
            warehouse_repo.clone(),
            action_log_repo,
            reconciliation_engine,
        ));
        let warehouse_api = Arc::new(WarehouseApi::new(conn, warehouse_repo));

        tracing::info!("ledger state ready");

        Ok(Self {
            db_path,
            shipment_api,
            dispatch_api,
            rotation_api,
            report_api,
            warehouse_api,
            config_manager,
        })
    }
}

/// Default database path
///
/// 1. `ITS_LEDGER_DB_PATH` when set and not blank
/// 2. `<user data dir>/its-stock-ledger/its_ledger.db`
/// 3. `./its_ledger.db`
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from(".").join(DB_FILE_NAME);
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("its-stock-ledger");
        // fall back to the working directory when the data dir is read-only
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join(DB_FILE_NAME);
        }
    }

    path.to_string_lossy().to_string()
}
