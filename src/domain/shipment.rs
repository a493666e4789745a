// ==========================================
// ITS Stock Ledger - shipment (navire) and cargo lines
// ==========================================

use crate::domain::types::ShipmentStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Shipment - vessel arrival
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub shipment_id: String,
    pub vessel_name: String,            // vessel identifier
    pub imo_number: Option<String>,
    pub flag: Option<String>,           // pavillon
    pub port: String,
    pub arrival_date: NaiveDate,
    pub bill_of_lading: Option<String>, // numéro de connaissement
    pub maritime_agent: Option<String>,
    pub status: ShipmentStatus,
    pub received_by: String,
    pub observations: Option<String>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// CargoLine - one product of a shipment
// ==========================================
// Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CargoLine {
    pub cargo_line_id: String,
    pub shipment_id: String,
    pub line_no: i32,
    pub product_reference: String,
    pub declared_quantity: f64,
    pub unit: String,
    pub origin: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Arrival metadata supplied by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewShipment {
    pub vessel_name: String,
    pub imo_number: Option<String>,
    pub flag: Option<String>,
    pub port: Option<String>,
    pub arrival_date: Option<NaiveDate>,
    pub bill_of_lading: Option<String>,
    pub maritime_agent: Option<String>,
    pub observations: Option<String>,
}

impl NewShipment {
    pub fn vessel(vessel_name: impl Into<String>) -> Self {
        Self {
            vessel_name: vessel_name.into(),
            ..Self::default()
        }
    }
}

/// One cargo line supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCargoLine {
    pub product_reference: String,
    pub declared_quantity: f64,
    pub unit: Option<String>,
    pub origin: Option<String>,
}

impl NewCargoLine {
    pub fn new(product_reference: impl Into<String>, declared_quantity: f64) -> Self {
        Self {
            product_reference: product_reference.into(),
            declared_quantity,
            unit: None,
            origin: None,
        }
    }
}

/// Shipment together with its cargo lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentWithCargo {
    pub shipment: Shipment,
    pub cargo_lines: Vec<CargoLine>,
}

impl ShipmentWithCargo {
    pub fn total_declared(&self) -> f64 {
        self.cargo_lines.iter().map(|l| l.declared_quantity).sum()
    }
}
