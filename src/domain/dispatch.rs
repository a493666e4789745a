// ==========================================
// ITS Stock Ledger - dispatch (allocation to a warehouse)
// ==========================================

use crate::domain::types::DispatchStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Dispatch - planned share of a cargo line for one warehouse
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub dispatch_id: String,
    pub cargo_line_id: String,
    pub shipment_id: String,
    pub warehouse_id: String,       // destination (magasin)
    pub product_reference: String,  // copied from the cargo line
    pub planned_quantity: f64,
    pub status: DispatchStatus,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// (warehouse, quantity) pair passed to allocate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub warehouse_id: String,
    pub quantity: f64,
}

impl AllocationRequest {
    pub fn new(warehouse_id: impl Into<String>, quantity: f64) -> Self {
        Self {
            warehouse_id: warehouse_id.into(),
            quantity,
        }
    }
}
