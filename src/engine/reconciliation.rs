// ==========================================
// ITS Stock Ledger - reconciliation engine
// ==========================================
// Dispatched vs received: outstanding quantities, reconciliation status,
// discrepancy statistics per driver. Inputs are query rows, outputs are
// report rows; nothing is written.
// ==========================================

use crate::config::LedgerConfigReader;
use crate::domain::report::{
    DiscrepancyLine, DiscrepancyReport, DispatchAggregate, DispatchOutstanding,
    DriverDiscrepancyStats, RotationSummary, WarehousePerformance,
};
use crate::domain::rotation::Rotation;
use crate::domain::types::{DispatchStatus, ReconciliationStatus, RotationStatus};
use crate::engine::quantity::{approx_eq, exceeds};
use crate::repository::error::RepositoryResult;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Driver label used when a rotation has no driver recorded
pub const UNKNOWN_DRIVER: &str = "(unknown)";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconciliationRules {
    pub tolerance: f64,
}

impl ReconciliationRules {
    /// Reconciliation status of one dispatch
    ///
    /// OPEN while rotations are running or nothing was closed yet;
    /// otherwise received vs planned decides.
    ///
    /// EXCESS cannot come out of ledger writes (delivered never exceeds
    /// planned, rotations never exceed their dispatch). It flags rows that
    /// were altered outside the ledger.
    pub fn classify(&self, agg: &DispatchAggregate) -> ReconciliationStatus {
        if agg.open_rotations > 0
            || matches!(agg.dispatch_status, DispatchStatus::Planned | DispatchStatus::InProgress)
        {
            return ReconciliationStatus::Open;
        }

        if exceeds(agg.received_quantity, agg.planned_quantity, self.tolerance) {
            ReconciliationStatus::Excess
        } else if approx_eq(agg.received_quantity, agg.planned_quantity, self.tolerance) {
            ReconciliationStatus::Conforming
        } else {
            ReconciliationStatus::Short
        }
    }

    pub fn outstanding(&self, agg: &DispatchAggregate) -> DispatchOutstanding {
        DispatchOutstanding {
            dispatch_id: agg.dispatch_id.clone(),
            warehouse_id: agg.warehouse_id.clone(),
            product_reference: agg.product_reference.clone(),
            dispatch_status: agg.dispatch_status,
            planned_quantity: agg.planned_quantity,
            scheduled_quantity: agg.scheduled_quantity,
            received_quantity: agg.received_quantity,
            outstanding_quantity: self.clamp(agg.planned_quantity - agg.received_quantity),
            unscheduled_quantity: self.clamp(agg.planned_quantity - agg.scheduled_quantity),
            open_rotations: agg.open_rotations,
            reconciliation: self.classify(agg),
        }
    }

    /// Group discrepancy lines by driver, largest total shortfall first
    pub fn discrepancy_report(&self, lines: Vec<DiscrepancyLine>) -> DiscrepancyReport {
        let mut by_driver: BTreeMap<String, (i64, f64)> = BTreeMap::new();
        let mut total_shortfall = 0.0;

        for line in &lines {
            let driver = line
                .driver_name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(UNKNOWN_DRIVER)
                .to_string();
            let entry = by_driver.entry(driver).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += line.shortfall;
            total_shortfall += line.shortfall;
        }

        let mut stats: Vec<DriverDiscrepancyStats> = by_driver
            .into_iter()
            .map(|(driver_name, (count, total))| DriverDiscrepancyStats {
                driver_name,
                discrepancy_count: count,
                total_shortfall: total,
                average_shortfall: total / count as f64,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.total_shortfall
                .partial_cmp(&a.total_shortfall)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.driver_name.cmp(&b.driver_name))
        });

        DiscrepancyReport {
            lines,
            by_driver: stats,
            total_shortfall,
        }
    }

    /// Dispatch counts, received quantities and conformity per warehouse
    ///
    /// Warehouses without dispatch are left out. Ordered by conformity
    /// rate (highest first, not yet rated last), then by name.
    pub fn warehouse_performance(
        &self,
        aggregates: &[DispatchAggregate],
        warehouse_names: &HashMap<String, String>,
    ) -> Vec<WarehousePerformance> {
        let mut by_warehouse: BTreeMap<&str, WarehousePerformance> = BTreeMap::new();

        for agg in aggregates {
            let row = by_warehouse
                .entry(agg.warehouse_id.as_str())
                .or_insert_with(|| WarehousePerformance {
                    warehouse_id: agg.warehouse_id.clone(),
                    warehouse_name: warehouse_names
                        .get(&agg.warehouse_id)
                        .cloned()
                        .unwrap_or_else(|| agg.warehouse_id.clone()),
                    dispatch_count: 0,
                    open_dispatch_count: 0,
                    closed_dispatch_count: 0,
                    conforming_dispatch_count: 0,
                    short_dispatch_count: 0,
                    planned_quantity: 0.0,
                    received_quantity: 0.0,
                    outstanding_quantity: 0.0,
                    shortfall_quantity: 0.0,
                    reception_rate: 0.0,
                    conformity_rate: None,
                });

            let gap = self.clamp(agg.planned_quantity - agg.received_quantity).max(0.0);
            row.dispatch_count += 1;
            row.planned_quantity += agg.planned_quantity;
            row.received_quantity += agg.received_quantity;
            row.outstanding_quantity += gap;

            match self.classify(agg) {
                ReconciliationStatus::Open => row.open_dispatch_count += 1,
                status => {
                    row.closed_dispatch_count += 1;
                    row.shortfall_quantity += gap;
                    match status {
                        ReconciliationStatus::Conforming => row.conforming_dispatch_count += 1,
                        ReconciliationStatus::Short => row.short_dispatch_count += 1,
                        _ => {}
                    }
                }
            }
        }

        let mut rows: Vec<WarehousePerformance> = by_warehouse
            .into_values()
            .map(|mut row| {
                row.reception_rate = percent(row.closed_dispatch_count, row.dispatch_count);
                if row.closed_dispatch_count > 0 {
                    row.conformity_rate = Some(percent(
                        row.conforming_dispatch_count,
                        row.closed_dispatch_count,
                    ));
                }
                row
            })
            .collect();

        rows.sort_by(|a, b| {
            let rate = |r: &WarehousePerformance| r.conformity_rate.unwrap_or(-1.0);
            rate(b)
                .partial_cmp(&rate(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.warehouse_name.cmp(&b.warehouse_name))
        });
        rows
    }

    fn clamp(&self, value: f64) -> f64 {
        if value.abs() <= self.tolerance {
            0.0
        } else {
            value
        }
    }
}

fn percent(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Per-status counts and totals over the rotations of one dispatch
pub fn summarize_rotations(rotations: &[Rotation]) -> RotationSummary {
    let mut summary = RotationSummary {
        total_rotations: rotations.len() as i64,
        ..RotationSummary::default()
    };

    for rotation in rotations {
        match rotation.status {
            RotationStatus::Pending => summary.pending += 1,
            RotationStatus::InTransit => summary.in_transit += 1,
            RotationStatus::Delivered => summary.delivered += 1,
            RotationStatus::ShortDelivered => summary.short_delivered += 1,
            RotationStatus::Cancelled => summary.cancelled += 1,
        }
        if rotation.status != RotationStatus::Cancelled {
            summary.total_planned += rotation.planned_quantity;
        }
        if rotation.status.is_received() {
            summary.total_received += rotation.delivered_quantity.unwrap_or(0.0);
        }
    }
    summary
}

// ==========================================
// ReconciliationEngine
// ==========================================
pub struct ReconciliationEngine<C>
where
    C: LedgerConfigReader,
{
    config: Arc<C>,
}

impl<C> ReconciliationEngine<C>
where
    C: LedgerConfigReader,
{
    pub fn new(config: Arc<C>) -> Self {
        Self { config }
    }

    pub fn rules(&self) -> RepositoryResult<ReconciliationRules> {
        Ok(ReconciliationRules {
            tolerance: self.config.get_quantity_tolerance()?,
        })
    }
}
