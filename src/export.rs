// ==========================================
// ITS Stock Ledger - CSV export of reports
// ==========================================
// Writers are generic over io::Write so callers can target a file,
// a buffer or stdout.
// ==========================================

use crate::domain::report::{DiscrepancyReport, WarehouseProductTotal};
use crate::repository::row_utils::format_ts;
use csv::Writer;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("output write failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Quantities are written with three decimals (kilogram precision)
fn qty(value: f64) -> String {
    format!("{:.3}", value)
}

/// One row per discrepancy line
///
/// # Returns
/// - number of data rows written
pub fn write_discrepancies_csv<W: Write>(report: &DiscrepancyReport, writer: W) -> ExportResult<usize> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record([
        "rotation_id",
        "dispatch_id",
        "sequence_no",
        "warehouse_id",
        "product_reference",
        "driver_name",
        "truck_number",
        "planned_quantity",
        "delivered_quantity",
        "shortfall",
        "completed_at",
    ])?;

    for line in &report.lines {
        wtr.write_record([
            line.rotation_id.clone(),
            line.dispatch_id.clone(),
            line.sequence_no.to_string(),
            line.warehouse_id.clone(),
            line.product_reference.clone(),
            line.driver_name.clone().unwrap_or_default(),
            line.truck_number.clone().unwrap_or_default(),
            qty(line.planned_quantity),
            qty(line.delivered_quantity),
            qty(line.shortfall),
            line.completed_at.as_ref().map(format_ts).unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(report.lines.len())
}

/// One row per product of the warehouse
pub fn write_warehouse_totals_csv<W: Write>(
    totals: &[WarehouseProductTotal],
    writer: W,
) -> ExportResult<usize> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record([
        "warehouse_id",
        "product_reference",
        "rotation_count",
        "total_planned",
        "total_delivered",
        "total_short_delivered",
        "total_received",
        "total_shortfall",
    ])?;

    for t in totals {
        wtr.write_record([
            t.warehouse_id.clone(),
            t.product_reference.clone(),
            t.rotation_count.to_string(),
            qty(t.total_planned),
            qty(t.total_delivered),
            qty(t.total_short_delivered),
            qty(t.total_received),
            qty(t.total_shortfall),
        ])?;
    }

    wtr.flush()?;
    Ok(totals.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::DiscrepancyLine;

    #[test]
    fn test_warehouse_totals_csv() {
        let totals = vec![WarehouseProductTotal {
            warehouse_id: "Warehouse-B".to_string(),
            product_reference: "MAIZE".to_string(),
            rotation_count: 1,
            total_planned: 400.0,
            total_delivered: 0.0,
            total_short_delivered: 350.0,
            total_received: 350.0,
            total_shortfall: 50.0,
        }];

        let mut buf = Vec::new();
        assert_eq!(write_warehouse_totals_csv(&totals, &mut buf).unwrap(), 1);

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("warehouse_id,product_reference"));
        assert_eq!(
            lines.next().unwrap(),
            "Warehouse-B,MAIZE,1,400.000,0.000,350.000,350.000,50.000"
        );
    }

    #[test]
    fn test_discrepancies_csv_escapes_fields() {
        let report = DiscrepancyReport {
            lines: vec![DiscrepancyLine {
                rotation_id: "r1".to_string(),
                dispatch_id: "d1".to_string(),
                sequence_no: 2,
                warehouse_id: "Warehouse-B".to_string(),
                product_reference: "MAIZE".to_string(),
                driver_name: Some("Diop, Awa".to_string()),
                truck_number: None,
                planned_quantity: 40.0,
                delivered_quantity: 37.5,
                shortfall: 2.5,
                completed_at: None,
            }],
            by_driver: vec![],
            total_shortfall: 2.5,
        };

        let mut buf = Vec::new();
        write_discrepancies_csv(&report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"Diop, Awa\""));
        assert!(text.contains("40.000,37.500,2.500,"));
    }
}
