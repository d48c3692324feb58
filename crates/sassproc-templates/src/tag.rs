/*
 * tag.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The `sass_src` reference shared by both template languages.

use sassproc_core::SassProcessor;
use sassproc_core::paths::is_sass_path;
use tracing::debug;

use crate::ast::PathExpr;
use crate::context::RenderContext;
use crate::error::{TemplateError, TemplateResult};

/// Name of the tag in the tag language and of the function in the
/// expression language.
pub const SASS_SRC: &str = "sass_src";

/// Tag library that provides `sass_src` in the tag language.
pub const SASS_TAG_LIBRARY: &str = "sass_tags";

/// One `sass_src` occurrence in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SassSrcTag {
    pub path: PathExpr,
    pub line: usize,
}

impl SassSrcTag {
    pub fn new(path: PathExpr, line: usize) -> Self {
        Self { path, line }
    }

    /// The logical path this tag refers to under `ctx`.
    ///
    /// An unbound variable resolves to the empty string.
    pub fn resolve_path(&self, ctx: &RenderContext) -> String {
        self.path.resolve(ctx).unwrap_or_default()
    }

    /// Whether the tag refers to a stylesheet under `ctx`.
    pub fn is_sass(&self, ctx: &RenderContext) -> bool {
        is_sass_path(&self.resolve_path(ctx))
    }

    /// Resolve the path, compile if needed, and return the public URL.
    ///
    /// A path that cannot be located becomes a syntax error naming
    /// `template` and this tag's line.
    pub fn render(
        &self,
        template: &str,
        ctx: &RenderContext,
        processor: &SassProcessor,
    ) -> TemplateResult<String> {
        let path = self.resolve_path(ctx);
        debug!(template, line = self.line, path = %path, "Rendering sass_src");
        match processor.resolve(&path) {
            Ok(url) => Ok(url),
            Err(e) if e.is_not_found() => Err(TemplateError::syntax(template, self.line, e.to_string())),
            Err(e) => Err(TemplateError::Processor(e)),
        }
    }
}
