// ==========================================
// ITS Stock Ledger - audit log
// ==========================================
// Every ledger write records one entry in the same transaction.
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,            // ActionType::as_str
    pub entity_id: String,              // shipment / cargo line / dispatch / rotation id
    pub actor: String,
    pub action_ts: NaiveDateTime,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

impl ActionLog {
    pub fn new(
        action_type: ActionType,
        entity_id: impl Into<String>,
        actor: impl Into<String>,
        payload_json: Option<JsonValue>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            entity_id: entity_id.into(),
            actor: actor.into(),
            action_ts: chrono::Local::now().naive_local(),
            payload_json,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    RegisterWarehouse,
    UpdateWarehouse,
    RecordShipment,
    Allocate,
    CancelDispatch,
    CreateRotation,
    StartRotation,
    CompleteRotation,
    CancelRotation,
    UpdateConfig,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::RegisterWarehouse => "REGISTER_WAREHOUSE",
            ActionType::UpdateWarehouse => "UPDATE_WAREHOUSE",
            ActionType::RecordShipment => "RECORD_SHIPMENT",
            ActionType::Allocate => "ALLOCATE",
            ActionType::CancelDispatch => "CANCEL_DISPATCH",
            ActionType::CreateRotation => "CREATE_ROTATION",
            ActionType::StartRotation => "START_ROTATION",
            ActionType::CompleteRotation => "COMPLETE_ROTATION",
            ActionType::CancelRotation => "CANCEL_ROTATION",
            ActionType::UpdateConfig => "UPDATE_CONFIG",
        }
    }
}
