// ==========================================
// ITS Stock Ledger - rotation engine
// ==========================================
// Invariants per dispatch:
//   SUM(planned_quantity of non-cancelled rotations) <= dispatch planned
//   delivered_quantity <= planned_quantity for every rotation
// ==========================================

use crate::config::LedgerConfigReader;
use crate::domain::report::DispatchProgress;
use crate::domain::rotation::{PlannedRotation, Rotation, RotationRequest, Truck};
use crate::domain::types::{DispatchStatus, RotationStatus};
use crate::engine::error::{RuleResult, RuleViolation};
use crate::engine::quantity::{approx_eq, ensure_non_negative, ensure_positive, exceeds};
use crate::repository::error::RepositoryResult;
use std::sync::Arc;

// ==========================================
// RotationRules
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationRules {
    pub tolerance: f64,
}

impl RotationRules {
    /// Validate a batch of new rotations against the dispatch quantity
    ///
    /// # Parameters
    /// - `dispatch_planned`: dispatch planned quantity
    /// - `already_planned`: SUM over the non-cancelled rotations, re-read
    ///   inside the transaction
    ///
    /// # Returns
    /// - requested total
    pub fn check_new_rotations(
        &self,
        dispatch_id: &str,
        dispatch_planned: f64,
        already_planned: f64,
        requests: &[RotationRequest],
    ) -> RuleResult<f64> {
        if requests.is_empty() {
            return Err(RuleViolation::EmptyRotationBatch);
        }

        let mut requested = 0.0;
        for request in requests {
            requested += ensure_positive("planned_quantity", request.planned_quantity)?;
        }

        if exceeds(already_planned + requested, dispatch_planned, self.tolerance) {
            return Err(RuleViolation::RotationExceedsDispatch {
                dispatch_id: dispatch_id.to_string(),
                dispatch_planned,
                already_planned,
                requested,
            });
        }
        Ok(requested)
    }

    /// Quantity still unplanned on a dispatch
    pub fn remaining(&self, dispatch_id: &str, dispatch_planned: f64, already_planned: f64) -> RuleResult<f64> {
        let remaining = dispatch_planned - already_planned;
        if remaining <= self.tolerance {
            return Err(RuleViolation::NothingLeftToPlan {
                dispatch_id: dispatch_id.to_string(),
            });
        }
        Ok(remaining)
    }

    /// Check a completion request against the rotation
    ///
    /// The state transition itself is checked by the caller.
    pub fn validate_completion(
        &self,
        rotation: &Rotation,
        delivered: f64,
        status: RotationStatus,
    ) -> RuleResult<()> {
        if !status.is_received() {
            return Err(RuleViolation::InvalidCompletionStatus { status });
        }

        ensure_non_negative("delivered_quantity", delivered)?;

        if exceeds(delivered, rotation.planned_quantity, self.tolerance) {
            return Err(RuleViolation::DeliveredExceedsPlanned {
                rotation_id: rotation.rotation_id.clone(),
                planned: rotation.planned_quantity,
                delivered,
            });
        }

        if status == RotationStatus::Delivered
            && !approx_eq(delivered, rotation.planned_quantity, self.tolerance)
        {
            return Err(RuleViolation::DeliveredBelowPlanned {
                rotation_id: rotation.rotation_id.clone(),
                planned: rotation.planned_quantity,
                delivered,
            });
        }

        Ok(())
    }

    /// Dispatch status implied by its rotations
    ///
    /// Open rotations keep the dispatch IN_PROGRESS. Once none is open,
    /// the received total decides between DELIVERED and PARTIAL; with no
    /// completed rotation at all (none yet, or all cancelled) it is PLANNED.
    pub fn derive_dispatch_status(&self, dispatch_planned: f64, progress: &DispatchProgress) -> DispatchStatus {
        if progress.open_rotations > 0 {
            DispatchStatus::InProgress
        } else if progress.completed_rotations == 0 {
            DispatchStatus::Planned
        } else if !exceeds(dispatch_planned, progress.received_quantity, self.tolerance) {
            DispatchStatus::Delivered
        } else {
            DispatchStatus::Partial
        }
    }
}

// ==========================================
// RotationPlanner - round-robin truck loads
// ==========================================

/// Upper bound on the loads of one plan
pub const MAX_PLANNED_LOADS: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct RotationPlanner {
    pub default_capacity: f64,
    pub tolerance: f64,
}

impl RotationPlanner {
    /// Split `quantity` into truck loads, cycling through `trucks`
    ///
    /// Each load is `min(remaining, truck capacity)`. With no truck, loads
    /// use the default capacity and carry no truck details. A plan needing
    /// more than `MAX_PLANNED_LOADS` loads is refused.
    pub fn plan(&self, quantity: f64, trucks: &[Truck]) -> RuleResult<Vec<PlannedRotation>> {
        ensure_positive("quantity", quantity)?;
        for truck in trucks {
            if !(truck.capacity.is_finite() && truck.capacity > self.tolerance) {
                return Err(RuleViolation::InvalidTruckCapacity {
                    truck_number: truck.truck_number.clone(),
                    capacity: truck.capacity,
                });
            }
        }
        if !(self.default_capacity.is_finite() && self.default_capacity > self.tolerance) {
            return Err(RuleViolation::InvalidQuantity {
                field: "default_capacity".to_string(),
                value: self.default_capacity,
            });
        }

        let mut planned = Vec::new();
        let mut remaining = quantity;
        let mut index = 0usize;

        while remaining > self.tolerance {
            if planned.len() >= MAX_PLANNED_LOADS {
                return Err(RuleViolation::TooManyLoads {
                    quantity,
                    max_loads: MAX_PLANNED_LOADS,
                });
            }
            let (capacity, truck_number, driver_name) = if trucks.is_empty() {
                (self.default_capacity, None, None)
            } else {
                let truck = &trucks[index % trucks.len()];
                (
                    truck.capacity,
                    Some(truck.truck_number.clone()),
                    truck.driver_name.clone(),
                )
            };

            let load = remaining.min(capacity);
            planned.push(PlannedRotation {
                sequence_no: planned.len() as i32 + 1,
                truck_number,
                driver_name,
                planned_quantity: load,
            });
            remaining -= load;
            index += 1;
        }

        Ok(planned)
    }
}

// ==========================================
// RotationEngine
// ==========================================
pub struct RotationEngine<C>
where
    C: LedgerConfigReader,
{
    config: Arc<C>,
}

impl<C> RotationEngine<C>
where
    C: LedgerConfigReader,
{
    pub fn new(config: Arc<C>) -> Self {
        Self { config }
    }

    /// Read before the write transaction is opened
    pub fn rules(&self) -> RepositoryResult<RotationRules> {
        Ok(RotationRules {
            tolerance: self.config.get_quantity_tolerance()?,
        })
    }

    pub fn planner(&self) -> RepositoryResult<RotationPlanner> {
        Ok(RotationPlanner {
            default_capacity: self.config.get_default_truck_capacity()?,
            tolerance: self.config.get_quantity_tolerance()?,
        })
    }
}
