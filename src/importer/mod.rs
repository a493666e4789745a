// ==========================================
// ITS Stock Ledger - importer layer
// ==========================================
// Cargo manifests from Excel / CSV into cargo lines.
// Parsing only: persistence goes through ShipmentApi.
// ==========================================

pub mod error;
pub mod file_parser;
pub mod manifest_importer;

pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRecord, UniversalFileParser};
pub use manifest_importer::{normalize_header, ManifestImporter};
