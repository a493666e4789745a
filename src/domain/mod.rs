// ==========================================
// ITS Stock Ledger - domain layer
// ==========================================
// Entities, status types, report rows
// No data access, no business rules
// ==========================================

pub mod action_log;
pub mod dispatch;
pub mod report;
pub mod rotation;
pub mod shipment;
pub mod types;
pub mod warehouse;

pub use action_log::{ActionLog, ActionType};
pub use dispatch::{AllocationRequest, Dispatch};
pub use report::{
    CargoLineBalance, DiscrepancyFilter, DiscrepancyLine, DiscrepancyReport, DispatchAggregate,
    DispatchOutstanding, DispatchProgress, DispatchRotations, DriverDiscrepancyStats, PeriodFilter,
    RotationFilter, RotationSummary, WarehousePerformance, WarehouseProductTotal, WarehouseStockRow,
};
pub use rotation::{PlannedRotation, Rotation, RotationDetails, RotationRequest, Truck};
pub use shipment::{CargoLine, NewCargoLine, NewShipment, Shipment, ShipmentWithCargo};
pub use types::{
    AllocationPolicy, DispatchStatus, ReconciliationStatus, RotationStatus, ShipmentStatus,
};
pub use warehouse::Warehouse;
