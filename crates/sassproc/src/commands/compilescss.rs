/*
 * compilescss.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Batch compilation command
 */

use std::path::Path;

use anyhow::{Context, Result};
use sassproc_offline::{BatchDriver, BatchOptions, Destination};
use sassproc_templates::Engine;
use tracing::warn;

use super::{build_processor, load_settings};

#[derive(Debug)]
pub struct CompileScssArgs<'a> {
    pub config: Option<&'a Path>,
    pub delete_files: bool,
    pub use_processor_root: bool,
    /// Empty means the tag language only.
    pub engines: Vec<Engine>,
    pub precision: Option<u32>,
}

pub fn execute(args: CompileScssArgs<'_>) -> Result<()> {
    let mut settings = load_settings(args.config)?;
    if args.precision.is_some() {
        settings.precision = args.precision;
    }
    let processor = build_processor(settings)?;

    let defaults = BatchOptions::default();
    let options = BatchOptions {
        engines: if args.engines.is_empty() {
            defaults.engines
        } else {
            args.engines
        },
        delete: args.delete_files,
        destination: if args.use_processor_root {
            Destination::Storage
        } else {
            Destination::SideBySide
        },
    };

    let report = BatchDriver::new(&processor, options)
        .run()
        .context("Batch compilation failed")?;

    for failure in &report.failures {
        warn!(origin = %failure.origin, "{}", failure.message);
    }
    if args.delete_files {
        println!(
            "Successfully deleted {} previously generated `*.css` files.",
            report.processed
        );
    } else {
        println!(
            "Successfully compiled {} referred SASS/SCSS files.",
            report.processed
        );
    }
    Ok(())
}
