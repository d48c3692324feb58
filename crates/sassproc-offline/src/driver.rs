/*
 * driver.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Batch compile or delete every referenced stylesheet.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sassproc_core::SassProcessor;
use sassproc_core::paths::normalize_path;
use sassproc_runtime::SystemRuntime;
use sassproc_templates::{Engine, TemplateLoader};
use tracing::{debug, info, warn};

use crate::error::BatchResult;
use crate::reference::{BatchFailure, Reference};
use crate::sources::scan_sources;
use crate::templates::scan_templates;

/// Where batch output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    /// `<stem>.css` next to each source, without a source map.
    #[default]
    SideBySide,
    /// CSS and source map through the processor's configured storage.
    Storage,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Template languages to scan with; each one rescans every template.
    /// A template written in one language fails to parse in the other.
    pub engines: Vec<Engine>,
    /// Remove artifacts instead of compiling.
    pub delete: bool,
    pub destination: Destination,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            engines: vec![Engine::Tags],
            delete: false,
            destination: Destination::default(),
        }
    }
}

/// Everything the scans found.
#[derive(Debug, Default)]
pub struct Discovery {
    pub references: Vec<Reference>,
    pub failures: Vec<BatchFailure>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Stylesheets compiled, or stylesheets whose artifacts were removed in
    /// delete mode.
    pub processed: usize,
    /// References whose stylesheet could not be located.
    pub skipped: usize,
    pub failures: Vec<BatchFailure>,
}

pub struct BatchDriver<'a> {
    processor: &'a SassProcessor,
    loader: TemplateLoader,
    options: BatchOptions,
}

impl<'a> BatchDriver<'a> {
    pub fn new(processor: &'a SassProcessor, options: BatchOptions) -> Self {
        Self {
            loader: TemplateLoader::from_settings(processor.settings()),
            processor,
            options,
        }
    }

    pub fn with_loader(mut self, loader: TemplateLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Run the template scan for each engine, then the source scan.
    ///
    /// Fails only when there are no template directories or no templates.
    pub fn discover(&self) -> BatchResult<Discovery> {
        let mut discovery = Discovery::default();
        for engine in &self.options.engines {
            let scan = scan_templates(&self.loader, *engine)?;
            info!(
                engine = %engine,
                templates = scan.templates,
                references = scan.references.len(),
                "Scanned templates"
            );
            discovery.references.extend(scan.references);
            discovery.failures.extend(scan.failures);
        }

        let settings = self.processor.settings();
        if !settings.source_dirs.is_empty() {
            let scan = scan_sources(
                self.processor.runtime().as_ref(),
                &settings.source_dirs,
                &settings.trigger_function,
            );
            info!(
                files = scan.files,
                references = scan.references.len(),
                "Scanned source files"
            );
            discovery.references.extend(scan.references);
            discovery.failures.extend(scan.failures);
        }
        Ok(discovery)
    }

    pub fn run(&self) -> BatchResult<BatchReport> {
        let discovery = self.discover()?;
        let mut report = BatchReport {
            failures: discovery.failures,
            ..BatchReport::default()
        };

        let mut seen: HashSet<PathBuf> = HashSet::new();
        for reference in &discovery.references {
            let source = match self.processor.find_source(&reference.path) {
                Ok(source) => source,
                Err(e) => {
                    warn!(reference = %reference, error = %e, "Skipping stylesheet");
                    report.skipped += 1;
                    continue;
                }
            };
            if !seen.insert(normalize_path(&source)) {
                continue;
            }

            match self.process(reference, &source) {
                Ok(count) => report.processed += count,
                Err(e) => {
                    warn!(reference = %reference, error = %e, "Batch processing failed");
                    report.failures.push(BatchFailure {
                        origin: reference.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            processed = report.processed,
            skipped = report.skipped,
            failures = report.failures.len(),
            delete = self.options.delete,
            "Batch run finished"
        );
        Ok(report)
    }

    fn process(&self, reference: &Reference, source: &Path) -> sassproc_core::Result<usize> {
        let runtime = self.processor.runtime();
        match (self.options.delete, self.options.destination) {
            (false, Destination::Storage) => {
                let url = self.processor.compile_now(&reference.path)?;
                info!(source = %source.display(), url = %url, "Compiled");
                Ok(1)
            }
            (false, Destination::SideBySide) => {
                let target = side_by_side_css(source);
                let compiled = self.processor.compile_source(source, None)?;
                runtime.file_write(&target, compiled.css.as_bytes())?;
                info!(source = %source.display(), output = %target.display(), "Compiled");
                Ok(1)
            }
            (true, Destination::Storage) => {
                let removed = self.processor.delete_artifacts(&reference.path)?;
                debug!(path = %reference.path, removed, "Deleted artifacts");
                Ok(usize::from(removed > 0))
            }
            (true, Destination::SideBySide) => {
                let target = side_by_side_css(source);
                if !runtime.is_file(&target)? {
                    return Ok(0);
                }
                runtime.file_remove(&target)?;
                info!(output = %target.display(), "Deleted");
                Ok(1)
            }
        }
    }
}

/// `<dir>/<stem>.css` for a stylesheet source.
pub fn side_by_side_css(source: &Path) -> PathBuf {
    source.with_extension("css")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_by_side_css() {
        assert_eq!(
            side_by_side_css(Path::new("/p/static/css/main.scss")),
            PathBuf::from("/p/static/css/main.css")
        );
        assert_eq!(
            side_by_side_css(Path::new("theme.sass")),
            PathBuf::from("theme.css")
        );
    }

    #[test]
    fn test_default_options_scan_tag_language_only() {
        let options = BatchOptions::default();
        assert_eq!(options.engines, vec![Engine::Tags]);
        assert!(!options.delete);
        assert_eq!(options.destination, Destination::SideBySide);
    }
}
