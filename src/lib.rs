//! # Edutrack - Education-management data store
//!
//! Relational schema and typed access layer for a classroom application:
//! curricula, paper analyses, practice progress, gamification, quizzes,
//! notifications, parent-student links and image embeddings.
//!
//! Edutrack provides:
//! - Versioned, forward-only SQLite migrations for the 13-table schema
//! - Typed models with validated JSON columns (quiz options and answers)
//! - Fixed-dimension half-precision embeddings with an HNSW cosine index
//! - Store operations for the application workflows built on the schema

pub mod model;
pub mod embedding;
pub mod storage;
pub mod analysis;
pub mod query;
pub mod import;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use embedding::{HalfVector, HnswIndex, EMBEDDING_DIM};
pub use model::{NotificationType, QuestionType, Role};
pub use storage::SqliteStore;

/// Result type alias for Edutrack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Edutrack operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Vector has {actual} dimensions, expected {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },
}

/// Kind of constraint a rejected statement violated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityViolation {
    Unique,
    PrimaryKey,
    ForeignKey,
    Check,
    NotNull,
    Other,
}

impl Error {
    /// Classify a storage error as a data-integrity violation.
    ///
    /// The error itself is left untouched; callers decide how to present it.
    pub fn integrity_violation(&self) -> Option<IntegrityViolation> {
        use rusqlite::ffi;

        let Error::Storage(rusqlite::Error::SqliteFailure(err, _)) = self else {
            return None;
        };
        if err.code != rusqlite::ErrorCode::ConstraintViolation {
            return None;
        }
        Some(match err.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE => IntegrityViolation::Unique,
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY => IntegrityViolation::PrimaryKey,
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => IntegrityViolation::ForeignKey,
            ffi::SQLITE_CONSTRAINT_CHECK => IntegrityViolation::Check,
            ffi::SQLITE_CONSTRAINT_NOTNULL => IntegrityViolation::NotNull,
            _ => IntegrityViolation::Other,
        })
    }
}
