// ==========================================
// ITS Stock Ledger - reporting API
// ==========================================
// Read-only views over the ledger: outstanding quantities, discrepancy
// report (rapport des écarts), stock overview, CSV export, audit trail.
// ==========================================

use crate::api::check_date_range;
use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::action_log::ActionLog;
use crate::domain::report::{
    DiscrepancyFilter, DiscrepancyReport, DispatchOutstanding, PeriodFilter, WarehousePerformance,
    WarehouseStockRow,
};
use crate::engine::ReconciliationEngine;
use crate::export::{write_discrepancies_csv, write_warehouse_totals_csv};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::report_repo::ReportRepository;
use crate::repository::warehouse_repo::WarehouseRepository;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ReportApi {
    report_repo: Arc<ReportRepository>,
    warehouse_repo: Arc<WarehouseRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    reconciliation_engine: Arc<ReconciliationEngine<ConfigManager>>,
}

impl ReportApi {
    pub fn new(
        report_repo: Arc<ReportRepository>,
        warehouse_repo: Arc<WarehouseRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        reconciliation_engine: Arc<ReconciliationEngine<ConfigManager>>,
    ) -> Self {
        Self {
            report_repo,
            warehouse_repo,
            action_log_repo,
            reconciliation_engine,
        }
    }

    /// Remaining quantity and reconciliation status per dispatch
    pub fn outstanding_report(&self, warehouse_id: Option<&str>) -> ApiResult<Vec<DispatchOutstanding>> {
        let rules = self.reconciliation_engine.rules()?;
        let rows = self
            .report_repo
            .dispatch_aggregates(warehouse_id)?
            .iter()
            .map(|agg| rules.outstanding(agg))
            .collect::<Vec<_>>();
        debug!(warehouse_id = ?warehouse_id, dispatches = rows.len(), "outstanding report built");
        Ok(rows)
    }

    /// Completed rotations delivered short, grouped by driver
    pub fn discrepancy_report(&self, filter: &DiscrepancyFilter) -> ApiResult<DiscrepancyReport> {
        check_date_range(filter.from, filter.to)?;

        let rules = self.reconciliation_engine.rules()?;
        let lines = self.report_repo.discrepancy_lines(filter, rules.tolerance)?;
        let report = rules.discrepancy_report(lines);
        debug!(
            lines = report.lines.len(),
            drivers = report.by_driver.len(),
            total_shortfall = report.total_shortfall,
            "discrepancy report built"
        );
        Ok(report)
    }

    /// Dispatch conformity per warehouse (rapport de performance des magasins)
    ///
    /// `period` selects dispatches by creation date.
    pub fn warehouse_performance(&self, period: &PeriodFilter) -> ApiResult<Vec<WarehousePerformance>> {
        check_date_range(period.from, period.to)?;

        let rules = self.reconciliation_engine.rules()?;
        let aggregates = self.report_repo.dispatch_aggregates_in_period(period)?;
        let names: HashMap<String, String> = self
            .warehouse_repo
            .list_all()?
            .into_iter()
            .map(|w| (w.warehouse_id, w.name))
            .collect();

        let rows = rules.warehouse_performance(&aggregates, &names);
        debug!(warehouses = rows.len(), dispatches = aggregates.len(), "warehouse performance built");
        Ok(rows)
    }

    /// Received totals of every (warehouse, product) pair
    pub fn stock_overview(&self) -> ApiResult<Vec<WarehouseStockRow>> {
        Ok(self.report_repo.stock_overview()?)
    }

    // ==========================================
    // CSV export
    // ==========================================

    pub fn export_discrepancies_csv<W: Write>(&self, filter: &DiscrepancyFilter, writer: W) -> ApiResult<usize> {
        let report = self.discrepancy_report(filter)?;
        let rows = write_discrepancies_csv(&report, writer)?;
        info!(rows, "discrepancies exported");
        Ok(rows)
    }

    pub fn export_warehouse_totals_csv<W: Write>(&self, warehouse_id: &str, writer: W) -> ApiResult<usize> {
        if self.warehouse_repo.find_by_id(warehouse_id)?.is_none() {
            return Err(ApiError::not_found("Warehouse", warehouse_id));
        }
        let totals = self.report_repo.warehouse_totals(warehouse_id)?;
        let rows = write_warehouse_totals_csv(&totals, writer)?;
        info!(warehouse_id, rows, "warehouse totals exported");
        Ok(rows)
    }

    // ==========================================
    // Audit trail
    // ==========================================

    /// Most recent entries first
    pub fn list_action_logs(&self, limit: usize) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.list_recent(limit)?)
    }

    /// Entries of one entity, oldest first
    pub fn list_action_logs_for_entity(&self, entity_id: &str) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_by_entity(entity_id)?)
    }
}
