// ==========================================
// ITS Stock Ledger - config reader trait
// ==========================================
// Read-only view of the settings the engines depend on.
// Implemented by ConfigManager (config_kv table).
// ==========================================

use crate::domain::types::AllocationPolicy;
use crate::repository::error::RepositoryResult;

// ==========================================
// LedgerConfigReader
// ==========================================
pub trait LedgerConfigReader: Send + Sync {
    /// Allocation policy
    ///
    /// # Default
    /// - EXACT
    fn get_allocation_policy(&self) -> RepositoryResult<AllocationPolicy>;

    /// Absolute tolerance for quantity comparisons (tonnes)
    ///
    /// # Default
    /// - 0.000001
    fn get_quantity_tolerance(&self) -> RepositoryResult<f64>;

    /// Truck capacity used by the rotation planner when no truck is given
    ///
    /// # Default
    /// - 40
    fn get_default_truck_capacity(&self) -> RepositoryResult<f64>;

    /// Unit applied to cargo lines recorded without one
    ///
    /// # Default
    /// - "tonnes"
    fn get_default_unit(&self) -> RepositoryResult<String>;

    /// Port applied to shipments recorded without one
    ///
    /// # Default
    /// - "Dakar"
    fn get_default_port(&self) -> RepositoryResult<String>;
}
