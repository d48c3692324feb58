/*
 * reference.rs
 * Copyright (c) 2025 Posit, PBC
 */

use std::fmt;

/// A stylesheet path found by one of the scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Logical path, as written at the reference site.
    pub path: String,
    /// Template name or source file the reference was found in.
    pub origin: String,
    /// 1-based line of the reference.
    pub line: usize,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.path, self.origin, self.line)
    }
}

/// A template, source file or stylesheet that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub origin: String,
    pub message: String,
}
