// ==========================================
// ITS Stock Ledger - config manager
// ==========================================
// Load / query / override settings stored in config_kv (scope 'global').
// Unreadable values fall back to their default with a warning.
// ==========================================

use crate::config::ledger_config_reader::LedgerConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::AllocationPolicy;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const GLOBAL_SCOPE: &str = "global";

/// One stored setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// Open a dedicated connection on `db_path`
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Share an existing connection
    ///
    /// The shared PRAGMAs are applied again (idempotent).
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Raw value of `key` (None when unset)
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    fn get_parsed_or_default<T, F>(&self, key: &str, default: T, parse: F) -> RepositoryResult<T>
    where
        F: Fn(&str) -> Option<T>,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match parse(&raw) {
                Some(v) => Ok(v),
                None => {
                    warn!(key, value = %raw, "unreadable config value, using default");
                    Ok(default)
                }
            },
        }
    }

    /// Set (upsert) a setting and record the change in action_log
    ///
    /// # Errors
    /// - `FieldValueError` when the key is unknown or the value would not
    ///   be readable back
    pub fn set_config(&self, key: &str, value: &str, actor: &str) -> RepositoryResult<()> {
        validate_entry(key, value)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        ActionLogRepository::insert_tx(
            &tx,
            &ActionLog::new(
                ActionType::UpdateConfig,
                key,
                actor,
                Some(json!({ "key": key, "value": value })),
            ),
        )?;
        tx.commit()?;

        info!(key, value, actor, "config updated");
        Ok(())
    }

    /// All stored global settings ordered by key
    pub fn list_configs(&self) -> RepositoryResult<Vec<ConfigEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT key, value, updated_at FROM config_kv WHERE scope_id = ?1 ORDER BY key",
        )?;
        let entries = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok(ConfigEntry {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Effective settings (stored values over defaults) as a JSON object
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let mut map: BTreeMap<String, String> = config_keys::DEFAULTS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for entry in self.list_configs()? {
            map.insert(entry.key, entry.value);
        }
        serde_json::to_string(&map).map_err(|e| RepositoryError::InternalError(e.to_string()))
    }
}

fn validate_entry(key: &str, value: &str) -> RepositoryResult<()> {
    let invalid = |message: &str| RepositoryError::FieldValueError {
        field: key.to_string(),
        message: message.to_string(),
    };

    match key {
        config_keys::ALLOCATION_POLICY => AllocationPolicy::from_db_str(value)
            .map(|_| ())
            .ok_or_else(|| invalid("expected EXACT or PARTIAL")),
        config_keys::QUANTITY_TOLERANCE_T => match parse_tolerance(value) {
            Some(_) => Ok(()),
            None => Err(invalid(&format!(
                "expected a number between 0 and {}",
                config_keys::MAX_TOLERANCE
            ))),
        },
        config_keys::DEFAULT_TRUCK_CAPACITY_T => match parse_capacity(value) {
            Some(_) => Ok(()),
            None => Err(invalid(&format!(
                "expected a finite number > {}",
                config_keys::MAX_TOLERANCE
            ))),
        },
        config_keys::DEFAULT_UNIT | config_keys::DEFAULT_PORT => {
            if value.trim().is_empty() {
                Err(invalid("must not be blank"))
            } else {
                Ok(())
            }
        }
        _ => Err(invalid("unknown config key")),
    }
}

fn parse_non_negative(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Tolerance only absorbs float noise; it must never widen an invariant
fn parse_tolerance(raw: &str) -> Option<f64> {
    parse_non_negative(raw).filter(|v| *v <= config_keys::MAX_TOLERANCE)
}

/// A truck must carry more than the tolerance, or a load rounds to nothing
fn parse_capacity(raw: &str) -> Option<f64> {
    parse_non_negative(raw).filter(|v| *v > config_keys::MAX_TOLERANCE)
}

fn parse_non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ==========================================
// LedgerConfigReader implementation
// ==========================================
impl LedgerConfigReader for ConfigManager {
    fn get_allocation_policy(&self) -> RepositoryResult<AllocationPolicy> {
        self.get_parsed_or_default(
            config_keys::ALLOCATION_POLICY,
            AllocationPolicy::default(),
            AllocationPolicy::from_db_str,
        )
    }

    fn get_quantity_tolerance(&self) -> RepositoryResult<f64> {
        self.get_parsed_or_default(
            config_keys::QUANTITY_TOLERANCE_T,
            config_keys::DEFAULT_TOLERANCE,
            parse_tolerance,
        )
    }

    fn get_default_truck_capacity(&self) -> RepositoryResult<f64> {
        self.get_parsed_or_default(
            config_keys::DEFAULT_TRUCK_CAPACITY_T,
            config_keys::DEFAULT_TRUCK_CAPACITY,
            parse_capacity,
        )
    }

    fn get_default_unit(&self) -> RepositoryResult<String> {
        let raw = self.get_config_or_default(config_keys::DEFAULT_UNIT, "tonnes")?;
        Ok(parse_non_blank(&raw).unwrap_or_else(|| "tonnes".to_string()))
    }

    fn get_default_port(&self) -> RepositoryResult<String> {
        let raw = self.get_config_or_default(config_keys::DEFAULT_PORT, "Dakar")?;
        Ok(parse_non_blank(&raw).unwrap_or_else(|| "Dakar".to_string()))
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    // dispatch allocation
    pub const ALLOCATION_POLICY: &str = "allocation.policy";

    // quantities
    pub const QUANTITY_TOLERANCE_T: &str = "quantity.tolerance_t";
    pub const DEFAULT_TOLERANCE: f64 = 0.000_001;
    pub const MAX_TOLERANCE: f64 = 0.001;

    // rotation planning
    pub const DEFAULT_TRUCK_CAPACITY_T: &str = "rotation.default_truck_capacity_t";
    pub const DEFAULT_TRUCK_CAPACITY: f64 = 40.0;

    // shipment intake
    pub const DEFAULT_UNIT: &str = "shipment.default_unit";
    pub const DEFAULT_PORT: &str = "shipment.default_port";

    pub const DEFAULTS: &[(&str, &str)] = &[
        (ALLOCATION_POLICY, "EXACT"),
        (QUANTITY_TOLERANCE_T, "0.000001"),
        (DEFAULT_TRUCK_CAPACITY_T, "40"),
        (DEFAULT_UNIT, "tonnes"),
        (DEFAULT_PORT, "Dakar"),
    ];
}
