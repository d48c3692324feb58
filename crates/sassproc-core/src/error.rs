//! Error types for the compilation engine.
//!
//! Copyright (c) 2025 Posit, PBC

use sassproc_runtime::RuntimeError;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur while resolving or compiling a stylesheet
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The logical path does not resolve to any physical source
    #[error("Unable to locate file {path}")]
    NotFound { path: String },

    /// The compiler rejected the stylesheet
    #[error("SASS compilation of {path} failed: {message}")]
    Compile { path: String, message: String },

    /// Settings are missing or inconsistent
    #[error("Improperly configured: {0}")]
    Config(String),

    /// The storage backend failed
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// A runtime (filesystem/process) operation failed
    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    /// A source map could not be written or read
    #[error("Invalid source map {path}: {message}")]
    SourceMap { path: String, message: String },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessorError {
    /// Create a not-found error for a logical path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Whether this error means the logical path could not be located.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StorageError> for ProcessorError {
    fn from(e: StorageError) -> Self {
        match e {
            // A backend that cannot be built is a settings problem
            StorageError::Config(message) => Self::Config(message),
            other => Self::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
