// ==========================================
// ITS Stock Ledger - rotation (one truck trip)
// ==========================================

use crate::domain::types::RotationStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Rotation
// ==========================================
// delivered_quantity stays None until the rotation is completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub rotation_id: String,
    pub dispatch_id: String,
    pub sequence_no: i32,
    pub planned_quantity: f64,
    pub delivered_quantity: Option<f64>,
    pub status: RotationStatus,
    pub driver_name: Option<String>,
    pub truck_number: Option<String>,
    pub observations: Option<String>,
    pub received_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub departed_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

impl Rotation {
    /// planned - delivered for completed rotations (écart)
    pub fn shortfall(&self) -> Option<f64> {
        if self.status.is_received() {
            self.delivered_quantity.map(|d| self.planned_quantity - d)
        } else {
            None
        }
    }
}

/// Truck and driver details attached to a new rotation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationDetails {
    pub driver_name: Option<String>,
    pub truck_number: Option<String>,
    pub observations: Option<String>,
}

/// One entry of a multi-rotation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationRequest {
    pub planned_quantity: f64,
    #[serde(default)]
    pub details: RotationDetails,
}

/// A truck available for rotation planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truck {
    pub truck_number: String,
    pub driver_name: Option<String>,
    pub capacity: f64,
}

/// Planner output: one proposed rotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRotation {
    pub sequence_no: i32,
    pub truck_number: Option<String>,
    pub driver_name: Option<String>,
    pub planned_quantity: f64,
}

impl From<&PlannedRotation> for RotationRequest {
    fn from(p: &PlannedRotation) -> Self {
        RotationRequest {
            planned_quantity: p.planned_quantity,
            details: RotationDetails {
                driver_name: p.driver_name.clone(),
                truck_number: p.truck_number.clone(),
                observations: None,
            },
        }
    }
}
