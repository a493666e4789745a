// ==========================================
// ITS Stock Ledger - command line entry point
// ==========================================
// Usage:
//   its-stock-ledger [overview | outstanding | discrepancies]
// Database: ITS_LEDGER_DB_PATH or the user data directory
// ==========================================

use anyhow::{anyhow, bail, Result};
use its_stock_ledger::app::{get_default_db_path, AppState};
use its_stock_ledger::domain::DiscrepancyFilter;
use its_stock_ledger::i18n::{status_label, t, t_with_args};
use its_stock_ledger::logging;

fn print_overview(state: &AppState) -> Result<()> {
    let rows = state.report_api.stock_overview()?;
    println!("{:<16} {:<24} {:>14}", "warehouse", "product", "received");
    for row in rows {
        println!(
            "{:<16} {:<24} {:>14.3}",
            row.warehouse_id, row.product_reference, row.total_received
        );
    }
    Ok(())
}

fn print_outstanding(state: &AppState) -> Result<()> {
    let rows = state.report_api.outstanding_report(None)?;
    println!(
        "{:<38} {:<16} {:>12} {:>12} {:>12}  {}",
        "dispatch", "warehouse", "planned", "received", "outstanding", "status"
    );
    for row in rows {
        println!(
            "{:<38} {:<16} {:>12.3} {:>12.3} {:>12.3}  {}",
            row.dispatch_id,
            row.warehouse_id,
            row.planned_quantity,
            row.received_quantity,
            row.outstanding_quantity,
            status_label("reconciliation_status", row.reconciliation.to_db_str()),
        );
    }
    Ok(())
}

fn print_discrepancies(state: &AppState) -> Result<()> {
    let report = state
        .report_api
        .discrepancy_report(&DiscrepancyFilter::default())?;
    for stats in &report.by_driver {
        println!(
            "{:<24} {:>4}  {}",
            stats.driver_name,
            stats.discrepancy_count,
            t_with_args(
                "report.shortfall",
                &[("quantity", &format!("{:.3}", stats.total_shortfall)), ("unit", "t")],
            ),
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    logging::init();

    let db_path = get_default_db_path();
    tracing::info!("{}", t_with_args("app.started", &[("path", &db_path)]));
    println!("{} v{}", t("app.name"), its_stock_ledger::VERSION);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let command = std::env::args().nth(1).unwrap_or_else(|| "overview".to_string());
    match command.as_str() {
        "overview" => print_overview(&state),
        "outstanding" => print_outstanding(&state),
        "discrepancies" => print_discrepancies(&state),
        other => bail!("unknown command '{}': expected overview, outstanding or discrepancies", other),
    }
}
