// ==========================================
// ITS Stock Ledger - audit log repository
// ==========================================
// Every ledger write inserts one row through `insert_tx`, inside the
// transaction of the write itself.
// ==========================================

mod core;
mod queries;


pub use core::ActionLogRepository;
