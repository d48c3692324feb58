/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

use sassproc_core::ProcessorError;
use thiserror::Error;

/// Errors that abort a whole batch run.
///
/// Problems with a single template, source file or stylesheet never
/// surface here; they are logged and collected in the report instead.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("No template directories are configured (set `template-dirs` or `app-dirs`)")]
    NoTemplatePaths,

    #[error("No templates with extensions {extensions:?} found in {dirs}")]
    NoTemplates { dirs: String, extensions: Vec<String> },

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BatchResult<T> = Result<T, BatchError>;
