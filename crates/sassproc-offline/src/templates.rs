/*
 * templates.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template scan: every literal `sass_src` reference in every template.

use std::collections::{HashMap, HashSet};

use sassproc_core::paths::is_sass_path;
use sassproc_templates::{Engine, MAX_DEPTH, Template, TemplateLoader};
use tracing::{debug, warn};

use crate::error::{BatchError, BatchResult};
use crate::reference::{Reference, BatchFailure};

/// Result of scanning one loader with one template language.
#[derive(Debug, Default)]
pub struct TemplateScan {
    pub templates: usize,
    pub references: Vec<Reference>,
    pub failures: Vec<BatchFailure>,
}

/// Parse every template `loader` can list and collect stylesheet references.
///
/// `extends` and `include` targets are followed so references that live
/// only in parent or included templates are found too. Templates that fail
/// to load or parse are logged and recorded, never fatal.
pub fn scan_templates(loader: &TemplateLoader, engine: Engine) -> BatchResult<TemplateScan> {
    if loader.dirs().is_empty() {
        return Err(BatchError::NoTemplatePaths);
    }
    let names = loader.list();
    if names.is_empty() {
        return Err(BatchError::NoTemplates {
            dirs: loader
                .dirs()
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            extensions: loader.extensions().to_vec(),
        });
    }

    let mut scanner = Scanner {
        loader,
        engine,
        parsed: HashMap::new(),
        scan: TemplateScan {
            templates: names.len(),
            ..TemplateScan::default()
        },
    };
    for (name, _) in &names {
        let mut seen = HashSet::new();
        scanner.visit(name, 0, &mut seen);
    }
    debug!(
        engine = %engine,
        templates = scanner.scan.templates,
        references = scanner.scan.references.len(),
        "Template scan finished"
    );
    Ok(scanner.scan)
}

struct Scanner<'a> {
    loader: &'a TemplateLoader,
    engine: Engine,
    /// Parse results by name; `None` marks a template that already failed.
    parsed: HashMap<String, Option<Template>>,
    scan: TemplateScan,
}

impl Scanner<'_> {
    fn visit(&mut self, name: &str, depth: usize, seen: &mut HashSet<String>) {
        if depth > MAX_DEPTH || !seen.insert(name.to_string()) {
            return;
        }
        let Some(template) = self.template(name) else {
            return;
        };

        for tag in template.sass_references() {
            if let Some(path) = tag.path.as_literal()
                && is_sass_path(path)
            {
                self.scan.references.push(Reference {
                    path: path.to_string(),
                    origin: template.name.clone(),
                    line: tag.line,
                });
            }
        }

        let related: Vec<String> = template
            .extends()
            .into_iter()
            .chain(template.includes())
            .filter_map(|expr| expr.as_literal().map(str::to_string))
            .collect();
        for next in related {
            self.visit(&next, depth + 1, seen);
        }
    }

    fn template(&mut self, name: &str) -> Option<Template> {
        if let Some(cached) = self.parsed.get(name) {
            return cached.clone();
        }
        let result = self
            .loader
            .load(name)
            .and_then(|loaded| Template::parse(self.engine, &loaded.name, &loaded.source));
        let template = match result {
            Ok(template) => Some(template),
            Err(e) => {
                warn!(template = name, engine = %self.engine, error = %e, "Skipping template");
                self.scan.failures.push(BatchFailure {
                    origin: name.to_string(),
                    message: e.to_string(),
                });
                None
            }
        };
        self.parsed.insert(name.to_string(), template.clone());
        template
    }
}
