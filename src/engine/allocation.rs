// ==========================================
// ITS Stock Ledger - allocation engine
// ==========================================
// Invariant: for every cargo line,
//   SUM(dispatch.planned_quantity) <= declared_quantity
// and under the EXACT policy the allocation closes the line exactly.
// ==========================================
// Pure checks: the engine never touches the database. The caller feeds
// it the figures it re-read inside its transaction.
// ==========================================

use crate::config::LedgerConfigReader;
use crate::domain::dispatch::AllocationRequest;
use crate::domain::types::AllocationPolicy;
use crate::engine::error::{RuleResult, RuleViolation};
use crate::engine::quantity::{approx_eq, ensure_not_blank, ensure_positive, exceeds};
use crate::repository::error::RepositoryResult;
use std::collections::HashSet;
use std::sync::Arc;

/// Policy and tolerance in force for one allocate call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationRules {
    pub policy: AllocationPolicy,
    pub tolerance: f64,
}

impl AllocationRules {
    /// Shape checks on the request list, before any database read
    ///
    /// # Returns
    /// - total requested quantity
    pub fn validate_requests(&self, requests: &[AllocationRequest]) -> RuleResult<f64> {
        if requests.is_empty() {
            return Err(RuleViolation::EmptyAllocation);
        }

        let mut seen = HashSet::new();
        let mut total = 0.0;
        for request in requests {
            let warehouse_id = ensure_not_blank("warehouse_id", &request.warehouse_id)?;
            total += ensure_positive("quantity", request.quantity)?;
            if !seen.insert(warehouse_id.clone()) {
                return Err(RuleViolation::DuplicateWarehouse { warehouse_id });
            }
        }
        Ok(total)
    }

    /// Compare the requested total with what the cargo line still allows
    pub fn check_against_declared(
        &self,
        cargo_line_id: &str,
        declared: f64,
        already_allocated: f64,
        requested: f64,
    ) -> RuleResult<()> {
        let after = already_allocated + requested;

        if exceeds(after, declared, self.tolerance) {
            return Err(RuleViolation::AllocationExceedsDeclared {
                cargo_line_id: cargo_line_id.to_string(),
                declared,
                already_allocated,
                requested,
            });
        }

        if self.policy == AllocationPolicy::Exact && !approx_eq(after, declared, self.tolerance) {
            return Err(RuleViolation::AllocationMismatch {
                cargo_line_id: cargo_line_id.to_string(),
                declared,
                already_allocated,
                requested,
            });
        }

        Ok(())
    }

    /// Nothing of the declared quantity is left unallocated
    pub fn is_fully_allocated(&self, declared: f64, allocated: f64) -> bool {
        !exceeds(declared, allocated, self.tolerance)
    }
}

// ==========================================
// AllocationEngine
// ==========================================
pub struct AllocationEngine<C>
where
    C: LedgerConfigReader,
{
    config: Arc<C>,
}

impl<C> AllocationEngine<C>
where
    C: LedgerConfigReader,
{
    pub fn new(config: Arc<C>) -> Self {
        Self { config }
    }

    /// Read the current policy and tolerance
    ///
    /// Must be called before the write transaction is opened: the config
    /// reader may share the same connection.
    pub fn rules(&self) -> RepositoryResult<AllocationRules> {
        Ok(AllocationRules {
            policy: self.config.get_allocation_policy()?,
            tolerance: self.config.get_quantity_tolerance()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact() -> AllocationRules {
        AllocationRules {
            policy: AllocationPolicy::Exact,
            tolerance: 1e-6,
        }
    }

    fn partial() -> AllocationRules {
        AllocationRules {
            policy: AllocationPolicy::Partial,
            tolerance: 1e-6,
        }
    }

    #[test]
    fn test_validate_requests() {
        let rules = exact();
        assert_eq!(rules.validate_requests(&[]), Err(RuleViolation::EmptyAllocation));

        let total = rules
            .validate_requests(&[
                AllocationRequest::new("Warehouse-A", 120.0),
                AllocationRequest::new("Warehouse-B", 80.0),
            ])
            .unwrap();
        assert_eq!(total, 200.0);

        assert!(matches!(
            rules.validate_requests(&[AllocationRequest::new("Warehouse-A", 0.0)]),
            Err(RuleViolation::InvalidQuantity { .. })
        ));
        assert!(matches!(
            rules.validate_requests(&[AllocationRequest::new(" ", 10.0)]),
            Err(RuleViolation::BlankField { .. })
        ));
        assert_eq!(
            rules.validate_requests(&[
                AllocationRequest::new("Warehouse-A", 10.0),
                AllocationRequest::new("Warehouse-A", 20.0),
            ]),
            Err(RuleViolation::DuplicateWarehouse {
                warehouse_id: "Warehouse-A".to_string()
            })
        );
    }

    #[test]
    fn test_exact_policy_boundaries() {
        let rules = exact();
        assert!(rules.check_against_declared("c1", 200.0, 0.0, 200.0).is_ok());
        assert!(rules.check_against_declared("c1", 0.3, 0.1, 0.2).is_ok());

        let over = rules.check_against_declared("c1", 200.0, 0.0, 200.01).unwrap_err();
        assert!(matches!(over, RuleViolation::AllocationExceedsDeclared { .. }));
        assert!(over.is_invariant());

        let under = rules.check_against_declared("c1", 200.0, 0.0, 150.0).unwrap_err();
        assert!(matches!(under, RuleViolation::AllocationMismatch { .. }));
        assert!(under.is_invariant());
    }

    #[test]
    fn test_partial_policy_accumulates() {
        let rules = partial();
        assert!(rules.check_against_declared("c1", 200.0, 0.0, 150.0).is_ok());
        assert!(rules.check_against_declared("c1", 200.0, 150.0, 50.0).is_ok());
        assert!(matches!(
            rules.check_against_declared("c1", 200.0, 150.0, 50.5),
            Err(RuleViolation::AllocationExceedsDeclared { .. })
        ));
    }

    #[test]
    fn test_fully_allocated() {
        let rules = partial();
        assert!(rules.is_fully_allocated(200.0, 200.0));
        assert!(rules.is_fully_allocated(0.3, 0.1 + 0.2));
        assert!(!rules.is_fully_allocated(200.0, 150.0));
    }
}
