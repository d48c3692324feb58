/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template loading, parsing and rendering.

use sassproc_core::ProcessorError;
use thiserror::Error;

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Invalid template syntax, or a reference that cannot be resolved at
    /// render time. Always names the template and line responsible.
    #[error("{template}:{line}: {message}")]
    Syntax {
        template: String,
        line: usize,
        message: String,
    },

    /// No search directory contains the template.
    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    /// The template file is not valid UTF-8.
    #[error("Cannot decode template {template}: {message}")]
    Decode { template: String, message: String },

    /// `extends`/`include` chain too deep, usually a cycle.
    #[error("Template inclusion too deep (depth > {max_depth}): {name}")]
    RecursiveTemplate { name: String, max_depth: usize },

    /// The compilation engine failed for a reason other than a missing file.
    #[error("{0}")]
    Processor(#[from] ProcessorError),

    /// I/O error (e.g., reading a template file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    pub fn syntax(template: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        TemplateError::Syntax {
            template: template.into(),
            line,
            message: message.into(),
        }
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
