// ==========================================
// ITS Stock Ledger - SQLite connection setup
// ==========================================
// - Same PRAGMAs on every Connection::open (foreign keys are per connection)
// - Shared busy_timeout so a writer waiting on BEGIN IMMEDIATE blocks
//   instead of failing with SQLITE_BUSY
// ==========================================

use rusqlite::OptionalExtension;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Duration;

/// Default busy_timeout (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// schema_version expected by this build (see `migrations/v0.1_initial_schema.sql`)
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const INITIAL_SCHEMA_SQL: &str = include_str!("../migrations/v0.1_initial_schema.sql");

/// Apply the shared PRAGMAs to a connection
///
/// Notes:
/// - foreign_keys must be switched on per connection
/// - busy_timeout must be configured per connection
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a SQLite connection with the shared configuration
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Create all ledger tables (idempotent)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(INITIAL_SCHEMA_SQL)
}

/// Begin a write transaction that takes the database write lock up front.
///
/// Invariant checks (allocation sum, rotation sum) read and write inside
/// this transaction, so two writers can never both pass a stale check.
pub fn begin_immediate(conn: &mut Connection) -> rusqlite::Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

/// Read schema_version (None when the table does not exist)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
