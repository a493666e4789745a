// ==========================================
// ITS Stock Ledger - rule violations
// ==========================================
// Outcome of a failed business-rule check. Each violation is either an
// input problem (validation) or a breach of a ledger invariant.
// ==========================================

use crate::domain::types::RotationStatus;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleViolation {
    // ===== Validation =====
    #[error("{field} must be a finite quantity > 0, got {value}")]
    InvalidQuantity { field: String, value: f64 },

    #[error("{field} must not be blank")]
    BlankField { field: String },

    #[error("cargo list is empty")]
    EmptyCargo,

    #[error("allocation list is empty")]
    EmptyAllocation,

    #[error("warehouse {warehouse_id} appears more than once in the same allocation")]
    DuplicateWarehouse { warehouse_id: String },

    #[error("rotation list is empty")]
    EmptyRotationBatch,

    #[error("truck {truck_number} has no usable capacity ({capacity})")]
    InvalidTruckCapacity { truck_number: String, capacity: f64 },

    #[error("completion status must be DELIVERED or SHORT_DELIVERED, got {status}")]
    InvalidCompletionStatus { status: RotationStatus },

    #[error(
        "rotation {rotation_id}: {delivered} delivered for {planned} planned must be recorded as SHORT_DELIVERED"
    )]
    DeliveredBelowPlanned {
        rotation_id: String,
        planned: f64,
        delivered: f64,
    },

    #[error("splitting {quantity} needs more than {max_loads} truck loads")]
    TooManyLoads { quantity: f64, max_loads: usize },

    #[error("dispatch {dispatch_id} has no unplanned quantity left")]
    NothingLeftToPlan { dispatch_id: String },

    // ===== Invariants =====
    #[error(
        "cargo line {cargo_line_id}: {already_allocated} allocated + {requested} requested exceeds declared {declared}"
    )]
    AllocationExceedsDeclared {
        cargo_line_id: String,
        declared: f64,
        already_allocated: f64,
        requested: f64,
    },

    #[error(
        "cargo line {cargo_line_id}: {already_allocated} allocated + {requested} requested does not match declared {declared}"
    )]
    AllocationMismatch {
        cargo_line_id: String,
        declared: f64,
        already_allocated: f64,
        requested: f64,
    },

    #[error(
        "dispatch {dispatch_id}: {already_planned} planned + {requested} requested exceeds dispatch quantity {dispatch_planned}"
    )]
    RotationExceedsDispatch {
        dispatch_id: String,
        dispatch_planned: f64,
        already_planned: f64,
        requested: f64,
    },

    #[error("rotation {rotation_id}: delivered {delivered} exceeds planned {planned}")]
    DeliveredExceedsPlanned {
        rotation_id: String,
        planned: f64,
        delivered: f64,
    },
}

impl RuleViolation {
    /// Breach of a ledger invariant (as opposed to malformed input)
    pub fn is_invariant(&self) -> bool {
        matches!(
            self,
            RuleViolation::AllocationExceedsDeclared { .. }
                | RuleViolation::AllocationMismatch { .. }
                | RuleViolation::RotationExceedsDispatch { .. }
                | RuleViolation::DeliveredExceedsPlanned { .. }
        )
    }
}

pub type RuleResult<T> = Result<T, RuleViolation>;
