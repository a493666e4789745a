// ==========================================
// ITS Stock Ledger - repository layer
// ==========================================
// Data access only: no business rules live here.
// All statements are parameterised.
//
// Convention: `*_tx` associated functions take a borrowed Connection (or
// Transaction) so the api layer can compose several of them inside one
// BEGIN IMMEDIATE transaction; instance methods lock the shared
// connection for standalone reads.
// ==========================================

pub mod action_log_repo;
pub mod dispatch_repo;
pub mod error;
pub mod report_repo;
pub mod rotation_repo;
pub mod row_utils;
pub mod shipment_repo;
pub mod warehouse_repo;

pub use action_log_repo::ActionLogRepository;
pub use dispatch_repo::DispatchRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use report_repo::ReportRepository;
pub use rotation_repo::{RotationCompletion, RotationRepository};
pub use shipment_repo::ShipmentRepository;
pub use warehouse_repo::WarehouseRepository;
