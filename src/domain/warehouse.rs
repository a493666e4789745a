// ==========================================
// ITS Stock Ledger - warehouse (magasin)
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Destination warehouse; referenced by dispatches, never owned by them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub warehouse_id: String,
    pub name: String,
    pub location: Option<String>,
    pub active: bool,
    pub created_at: NaiveDateTime,
}
