// ==========================================
// ITS Stock Ledger - importer error type
// ==========================================

use thiserror::Error;

/// Manifest import errors; row numbers are 1-based spreadsheet rows
/// (row 1 is the header)
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== File =====
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file format: {0} (expected .xlsx / .xls / .csv)")]
    UnsupportedFormat(String),

    #[error("file read failed: {0}")]
    FileReadError(String),

    #[error("Excel parse failed: {0}")]
    ExcelParseError(String),

    #[error("CSV parse failed: {0}")]
    CsvParseError(String),

    // ===== Mapping =====
    #[error("required column missing: {0}")]
    MissingColumn(String),

    #[error("manifest contains no cargo line")]
    EmptyManifest,

    #[error("row {row}: {message}")]
    FieldMappingError { row: usize, message: String },

    #[error("row {row}, field {field}: {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    #[error("row {row}, field {field}: value {value} must be > 0")]
    ValueRangeError { row: usize, field: String, value: f64 },

    // ===== Generic =====
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
