// ==========================================
// ITS Stock Ledger - domain type definitions
// ==========================================
// Stored as SCREAMING_SNAKE_CASE strings (to_db_str / from_db_str)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Rotation status
// ==========================================
// PENDING → IN_TRANSIT → {DELIVERED | SHORT_DELIVERED}
// PENDING | IN_TRANSIT → CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotationStatus {
    Pending,        // planifiée
    InTransit,      // en transit
    Delivered,      // livrée
    ShortDelivered, // manquant
    Cancelled,      // annulée
}

impl RotationStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RotationStatus::Pending => "PENDING",
            RotationStatus::InTransit => "IN_TRANSIT",
            RotationStatus::Delivered => "DELIVERED",
            RotationStatus::ShortDelivered => "SHORT_DELIVERED",
            RotationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(RotationStatus::Pending),
            "IN_TRANSIT" => Some(RotationStatus::InTransit),
            "DELIVERED" => Some(RotationStatus::Delivered),
            "SHORT_DELIVERED" => Some(RotationStatus::ShortDelivered),
            "CANCELLED" => Some(RotationStatus::Cancelled),
            _ => None,
        }
    }

    /// No further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RotationStatus::Delivered | RotationStatus::ShortDelivered | RotationStatus::Cancelled
        )
    }

    /// Goods were received (counts towards warehouse totals)
    pub fn is_received(&self) -> bool {
        matches!(self, RotationStatus::Delivered | RotationStatus::ShortDelivered)
    }

    /// Operator-driven transitions allowed by the rotation state machine
    pub fn can_transition_to(&self, next: RotationStatus) -> bool {
        use RotationStatus::*;
        matches!(
            (self, next),
            (Pending, InTransit)
                | (InTransit, Delivered)
                | (InTransit, ShortDelivered)
                | (Pending, Cancelled)
                | (InTransit, Cancelled)
        )
    }
}

impl fmt::Display for RotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// Dispatch status
// ==========================================
// Derived from the rotations of the dispatch, written in the same
// transaction as the rotation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    Planned,    // no rotation yet
    InProgress, // at least one rotation open
    Delivered,  // all rotations closed, received >= planned
    Partial,    // all rotations closed, received < planned
    Cancelled,  // withdrawn before any rotation ran; allocation released
}

impl DispatchStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DispatchStatus::Planned => "PLANNED",
            DispatchStatus::InProgress => "IN_PROGRESS",
            DispatchStatus::Delivered => "DELIVERED",
            DispatchStatus::Partial => "PARTIAL",
            DispatchStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PLANNED" => Some(DispatchStatus::Planned),
            "IN_PROGRESS" => Some(DispatchStatus::InProgress),
            "DELIVERED" => Some(DispatchStatus::Delivered),
            "PARTIAL" => Some(DispatchStatus::Partial),
            "CANCELLED" => Some(DispatchStatus::Cancelled),
            _ => None,
        }
    }

    /// New rotations may still be attached
    pub fn accepts_rotations(&self) -> bool {
        !matches!(self, DispatchStatus::Delivered | DispatchStatus::Cancelled)
    }

    /// Counts towards the allocated total of its cargo line
    pub fn holds_allocation(&self) -> bool {
        !matches!(self, DispatchStatus::Cancelled)
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// Shipment status
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Received,   // réceptionné
    Dispatched, // every cargo line fully allocated
}

impl ShipmentStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Received => "RECEIVED",
            ShipmentStatus::Dispatched => "DISPATCHED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "RECEIVED" => Some(ShipmentStatus::Received),
            "DISPATCHED" => Some(ShipmentStatus::Dispatched),
            _ => None,
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// Allocation policy
// ==========================================
// EXACT: one allocate call must close the cargo line exactly
// PARTIAL: allocations may accumulate up to the declared quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationPolicy {
    Exact,
    Partial,
}

impl AllocationPolicy {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AllocationPolicy::Exact => "EXACT",
            AllocationPolicy::Partial => "PARTIAL",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "EXACT" => Some(AllocationPolicy::Exact),
            "PARTIAL" => Some(AllocationPolicy::Partial),
            _ => None,
        }
    }
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        AllocationPolicy::Exact
    }
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// Reconciliation status (dispatched vs received)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    Conforming, // conforme
    Short,      // manquant
    Excess,     // excédent
    Open,       // rotations still running
}

impl ReconciliationStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Conforming => "CONFORMING",
            ReconciliationStatus::Short => "SHORT",
            ReconciliationStatus::Excess => "EXCESS",
            ReconciliationStatus::Open => "OPEN",
        }
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
