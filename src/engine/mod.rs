// ==========================================
// ITS Stock Ledger - engine layer
// ==========================================
// Business rules only: engines never build SQL. They receive the figures
// the api layer re-read inside its transaction and answer with a
// RuleViolation when a rule does not hold.
// ==========================================

pub mod allocation;
pub mod error;
pub mod quantity;
pub mod reconciliation;
pub mod rotation;

pub use allocation::{AllocationEngine, AllocationRules};
pub use error::{RuleResult, RuleViolation};
pub use reconciliation::{summarize_rotations, ReconciliationEngine, ReconciliationRules};
pub use rotation::{RotationEngine, RotationPlanner, RotationRules};
