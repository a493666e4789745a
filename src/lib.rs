// ==========================================
// ITS Stock Ledger - core library
// ==========================================
// Maritime stock reconciliation for ITS Sénégal:
//   shipment → cargo lines → dispatches → rotations → warehouse totals
// Storage: SQLite (rusqlite)
// ==========================================

// Message catalogue
rust_i18n::i18n!("locales", fallback = "fr");

// ==========================================
// Modules
// ==========================================

// Domain - entities and types
pub mod domain;

// Repository - data access
pub mod repository;

// Engine - business rules
pub mod engine;

// Importer - cargo manifests
pub mod importer;

// Export - CSV reports
pub mod export;

// Configuration
pub mod config;

// Database setup (connection PRAGMAs, schema, transactions)
pub mod db;

pub mod logging;

pub mod i18n;

// API - ledger operations
pub mod api;

// Application wiring
pub mod app;

// ==========================================
// Re-exports
// ==========================================

pub use domain::types::{
    AllocationPolicy, DispatchStatus, ReconciliationStatus, RotationStatus, ShipmentStatus,
};

pub use domain::{
    ActionLog, ActionType, AllocationRequest, CargoLine, DiscrepancyFilter, DiscrepancyReport,
    Dispatch, DispatchOutstanding, DispatchRotations, NewCargoLine, NewShipment, PeriodFilter,
    Rotation, RotationDetails, RotationFilter, RotationRequest, Shipment, ShipmentWithCargo, Truck,
    Warehouse, WarehousePerformance, WarehouseProductTotal,
};

pub use engine::{AllocationEngine, ReconciliationEngine, RotationEngine, RotationPlanner};

pub use api::{
    ApiError, ApiErrorKind, ApiResult, DispatchApi, ReportApi, RotationApi, ShipmentApi,
    WarehouseApi,
};

pub use app::AppState;

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "ITS Stock Ledger";

pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
