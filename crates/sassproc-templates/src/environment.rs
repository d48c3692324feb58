/*
 * environment.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Render environment: one template language, one loader, one processor.

use std::sync::Arc;

use sassproc_core::SassProcessor;
use tracing::debug;

use crate::context::RenderContext;
use crate::engine::Engine;
use crate::error::TemplateResult;
use crate::loader::TemplateLoader;
use crate::template::Template;

/// Maximum `extends`/`include` nesting before rendering gives up.
pub const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct Environment {
    engine: Engine,
    loader: TemplateLoader,
    processor: Arc<SassProcessor>,
}

impl Environment {
    pub fn new(engine: Engine, loader: TemplateLoader, processor: Arc<SassProcessor>) -> Self {
        Self {
            engine,
            loader,
            processor,
        }
    }

    /// Environment whose loader follows the processor's settings.
    pub fn from_processor(engine: Engine, processor: Arc<SassProcessor>) -> Self {
        let loader = TemplateLoader::from_settings(processor.settings());
        Self::new(engine, loader, processor)
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn loader(&self) -> &TemplateLoader {
        &self.loader
    }

    pub fn processor(&self) -> &SassProcessor {
        &self.processor
    }

    /// Load and parse `name`.
    pub fn get_template(&self, name: &str) -> TemplateResult<Template> {
        let loaded = self.loader.load(name)?;
        Template::parse(self.engine, &loaded.name, &loaded.source)
    }

    /// Parse a template from a string that does not live in the loader's
    /// directories. `extends`/`include` still go through the loader.
    pub fn parse_string(&self, name: &str, source: &str) -> TemplateResult<Template> {
        Template::parse(self.engine, name, source)
    }

    pub fn render(&self, name: &str, ctx: &RenderContext) -> TemplateResult<String> {
        debug!(template = name, engine = %self.engine, "Rendering template");
        self.get_template(name)?.render(ctx, self)
    }
}
