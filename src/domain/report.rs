// ==========================================
// ITS Stock Ledger - report rows (read models)
// ==========================================
// All rows are computed by query on demand; none is stored.
// ==========================================

use crate::domain::rotation::Rotation;
use crate::domain::types::{DispatchStatus, ReconciliationStatus, RotationStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// WarehouseProductTotal - per (warehouse, product) totals
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseProductTotal {
    pub warehouse_id: String,
    pub product_reference: String,
    pub rotation_count: i64,        // non-cancelled rotations
    pub total_planned: f64,         // non-cancelled rotations
    pub total_delivered: f64,       // status DELIVERED
    pub total_short_delivered: f64, // status SHORT_DELIVERED
    pub total_received: f64,        // delivered + short-delivered
    pub total_shortfall: f64,       // planned - delivered over completed rotations
}

/// Received totals across all warehouses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseStockRow {
    pub warehouse_id: String,
    pub warehouse_name: String,
    pub product_reference: String,
    pub total_received: f64,
}

// ==========================================
// CargoLineBalance - declared vs allocated vs received
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CargoLineBalance {
    pub cargo_line_id: String,
    pub product_reference: String,
    pub declared_quantity: f64,
    pub allocated_quantity: f64,
    pub unallocated_quantity: f64,
    pub received_quantity: f64,
}

// ==========================================
// Dispatch rotations + summary
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationSummary {
    pub total_rotations: i64,
    pub pending: i64,
    pub in_transit: i64,
    pub delivered: i64,
    pub short_delivered: i64,
    pub cancelled: i64,
    pub total_planned: f64,  // non-cancelled
    pub total_received: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRotations {
    pub dispatch_id: String,
    pub rotations: Vec<Rotation>,
    pub summary: RotationSummary,
}

// ==========================================
// DispatchOutstanding - remaining quantity per dispatch
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutstanding {
    pub dispatch_id: String,
    pub warehouse_id: String,
    pub product_reference: String,
    pub dispatch_status: DispatchStatus,
    pub planned_quantity: f64,
    pub scheduled_quantity: f64,   // non-cancelled rotation planned
    pub received_quantity: f64,
    pub outstanding_quantity: f64, // planned - received
    pub unscheduled_quantity: f64, // planned - scheduled
    pub open_rotations: i64,
    pub reconciliation: ReconciliationStatus,
}

/// Rotation figures of one dispatch, read inside a write transaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchProgress {
    pub open_rotations: i64,      // PENDING + IN_TRANSIT
    pub completed_rotations: i64, // DELIVERED + SHORT_DELIVERED
    pub received_quantity: f64,
}

/// Raw aggregate read for one dispatch, before classification
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchAggregate {
    pub dispatch_id: String,
    pub warehouse_id: String,
    pub product_reference: String,
    pub dispatch_status: DispatchStatus,
    pub planned_quantity: f64,
    pub scheduled_quantity: f64,
    pub received_quantity: f64,
    pub open_rotations: i64,
}

// ==========================================
// WarehousePerformance - dispatch conformity per warehouse
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehousePerformance {
    pub warehouse_id: String,
    pub warehouse_name: String,
    pub dispatch_count: i64,
    pub open_dispatch_count: i64,       // reconciliation OPEN
    pub closed_dispatch_count: i64,     // every rotation closed
    pub conforming_dispatch_count: i64,
    pub short_dispatch_count: i64,
    pub planned_quantity: f64,
    pub received_quantity: f64,
    pub outstanding_quantity: f64,      // planned - received, every dispatch
    pub shortfall_quantity: f64,        // planned - received, closed dispatches
    pub reception_rate: f64,            // closed / dispatches, percent
    pub conformity_rate: Option<f64>,   // conforming / closed, percent; None before any close
}

/// Dispatch creation date range of the performance report (inclusive)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ==========================================
// Rotation listing filter
// ==========================================
// Dates apply to the last movement of the rotation:
// completion, else departure, else creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationFilter {
    pub dispatch_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub status: Option<RotationStatus>,
    pub received_only: bool, // DELIVERED or SHORT_DELIVERED (delivery history)
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RotationFilter {
    /// Delivery history of one warehouse, or of all when `None`
    pub fn history(warehouse_id: Option<&str>) -> Self {
        Self {
            warehouse_id: warehouse_id.map(str::to_string),
            received_only: true,
            ..Self::default()
        }
    }
}

// ==========================================
// Discrepancy report (rapport des écarts)
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyFilter {
    pub warehouse_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyLine {
    pub rotation_id: String,
    pub dispatch_id: String,
    pub sequence_no: i32,
    pub warehouse_id: String,
    pub product_reference: String,
    pub driver_name: Option<String>,
    pub truck_number: Option<String>,
    pub planned_quantity: f64,
    pub delivered_quantity: f64,
    pub shortfall: f64,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverDiscrepancyStats {
    pub driver_name: String,
    pub discrepancy_count: i64,
    pub total_shortfall: f64,
    pub average_shortfall: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscrepancyReport {
    pub lines: Vec<DiscrepancyLine>,
    pub by_driver: Vec<DriverDiscrepancyStats>,
    pub total_shortfall: f64,
}
