// ==========================================
// ITS Stock Ledger - API layer
// ==========================================
// Public operations of the ledger. Every write runs in one IMMEDIATE
// transaction: figures are re-read inside it, checked by the engines,
// written through the `_tx` repository functions and logged in
// action_log before commit.
// ==========================================

pub mod dispatch_api;
pub mod error;
pub mod report_api;
pub mod rotation_api;
pub mod shipment_api;
pub mod warehouse_api;

pub use dispatch_api::DispatchApi;
pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use report_api::ReportApi;
pub use rotation_api::RotationApi;
pub use shipment_api::ShipmentApi;
pub use warehouse_api::WarehouseApi;

use crate::engine::quantity::ensure_not_blank;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// Lock the shared connection for one API call
pub(crate) fn lock_conn(conn: &Arc<Mutex<Connection>>) -> ApiResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| ApiError::DatabaseConnectionError(format!("connection lock poisoned: {}", e)))
}

/// Actors are free text but never blank: every write is attributed
pub(crate) fn require_actor(actor: &str) -> ApiResult<String> {
    Ok(ensure_not_blank("actor", actor)?)
}

/// Inclusive date bounds must not be inverted
pub(crate) fn check_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ApiResult<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ApiError::InvalidInput(format!(
                "date range is inverted: {} > {}",
                from, to
            )));
        }
    }
    Ok(())
}
