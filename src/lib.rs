//! # Cellstore - spreadsheet cell ingestion
//!
//! Flattens uploaded workbooks into a category-keyed cell table and answers
//! aggregate and search queries over the accumulated values.
//!
//! Cellstore provides:
//! - SQLite-backed storage for categories, files and cells with a trigram index
//! - A workbook decomposer that turns every sheet into typed scalar values
//! - An ingestion service that persists one upload as a single unit of work
//! - Query operations: typed sum and case-insensitive region search
//! - An HTTP server and CLI over the same services

pub mod model;
pub mod storage;
pub mod decompose;
pub mod ingest;
pub mod query;
pub mod server;
pub mod config;

#[cfg(test)]
mod test_support;

// Re-exports for convenient access
pub use model::{Category, Cell, File, NewCell};
pub use decompose::{CellValue, SheetCells};
pub use ingest::{IngestReport, Upload};
pub use storage::{ConnectionPool, PooledConnection};

/// Result type alias for Cellstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Cellstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    // Wording kept as clients already match on it.
    #[error("Category {0} exists")]
    CategoryNotFound(String),

    #[error("Category {0} exists")]
    CategoryExists(String),

    #[error("Please upload an Excel file (.xlsx/.xls), not {0}")]
    UnsupportedMediaType(String),

    #[error("Empty file")]
    EmptyFile,

    #[error("Exception when parsing file: {0}")]
    Parse(#[from] calamine::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("Timed out after {0:?} waiting for a database connection")]
    PoolTimeout(std::time::Duration),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => {
                Error::ConstraintViolation(err.to_string())
            }
            _ => Error::Storage(err),
        }
    }
}

impl Error {
    /// Whether the error was caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::CategoryNotFound(_)
                | Error::CategoryExists(_)
                | Error::UnsupportedMediaType(_)
                | Error::EmptyFile
                | Error::Parse(_)
                | Error::ConstraintViolation(_)
        )
    }
}
