/*
 * findstatic.rs
 * Copyright (c) 2025 Posit, PBC
 */

use std::path::Path;

use anyhow::Result;
use tracing::debug;

use super::{build_processor, load_settings};

pub fn execute(config: Option<&Path>, path: &str) -> Result<()> {
    let processor = build_processor(load_settings(config)?)?;
    let Some((finder, location)) = processor.finders().find_with_source(path) else {
        anyhow::bail!("No matching file found for '{}'", path);
    };
    debug!(finder, "Found {}", path);
    println!("{}", location.display());
    Ok(())
}
