// ==========================================
// ITS Stock Ledger - configuration layer
// ==========================================
// Storage: config_kv table, scope 'global'
// ==========================================

pub mod config_manager;
pub mod ledger_config_reader;

pub use config_manager::{config_keys, ConfigEntry, ConfigManager};
pub use ledger_config_reader::LedgerConfigReader;
