/*
 * resolve.rs
 * Copyright (c) 2025 Posit, PBC
 */

use std::path::Path;

use anyhow::{Context, Result};

use super::{build_processor, load_settings};

pub fn execute(config: Option<&Path>, path: &str) -> Result<()> {
    let processor = build_processor(load_settings(config)?)?;
    let url = processor
        .resolve(path)
        .with_context(|| format!("Failed to resolve {}", path))?;
    println!("{}", url);
    Ok(())
}
