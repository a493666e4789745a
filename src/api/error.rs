// ==========================================
// ITS Stock Ledger - api error type
// ==========================================
// Every failure reaching a caller carries an explicit reason and maps to
// one ApiErrorKind so callers can branch without matching messages.
// ==========================================

use crate::engine::error::RuleViolation;
use crate::export::ExportError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error category exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorKind {
    Validation,
    InvariantViolation,
    NotFound,
    InvalidState,
    Internal,
}

#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // Business rules
    // ==========================================
    #[error("{0}")]
    Rule(#[from] RuleViolation),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown or inactive {entity}: {id}")]
    UnknownReference { entity: String, id: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("invalid state transition for {entity_id}: {from} -> {to}")]
    InvalidStateTransition {
        entity_id: String,
        from: String,
        to: String,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    // ==========================================
    // Import / export
    // ==========================================
    #[error("manifest import failed: {0}")]
    Import(#[from] ImportError),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),

    // ==========================================
    // Data access
    // ==========================================
    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("database connection failed: {0}")]
    DatabaseConnectionError(String),

    #[error("database transaction failed: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // Generic
    // ==========================================
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Rule(v) if v.is_invariant() => ApiErrorKind::InvariantViolation,
            ApiError::Rule(_)
            | ApiError::InvalidInput(_)
            | ApiError::UnknownReference { .. }
            | ApiError::Import(_) => ApiErrorKind::Validation,
            ApiError::NotFound { .. } => ApiErrorKind::NotFound,
            ApiError::InvalidStateTransition { .. } | ApiError::InvalidState(_) => {
                ApiErrorKind::InvalidState
            }
            ApiError::Export(_)
            | ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::DatabaseTransactionError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => ApiErrorKind::Internal,
        }
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        ApiError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn unknown_reference(entity: &str, id: &str) -> Self {
        ApiError::UnknownReference {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

// ==========================================
// From RepositoryError
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => ApiError::NotFound { entity, id },
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("connection lock poisoned: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::InvalidInput(format!("duplicate record: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::InvalidInput(format!("reference check failed: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::InvalidInput(format!("value rejected by schema: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("{}: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
