//! Command implementations for the sassproc CLI
//!
//! Each command module handles the CLI interface and delegates to the
//! library crates for the actual work.

pub mod compilescss;
pub mod findstatic;
pub mod render;
pub mod resolve;

use std::path::Path;

use anyhow::{Context, Result};
use sassproc_core::{SassProcessor, Settings};
use sassproc_runtime::{NativeRuntime, SystemRuntime};
use tracing::debug;

/// Settings from `config`, or from the nearest settings file above the
/// working directory, or the defaults.
pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    if let Some(path) = config {
        return Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()));
    }

    let cwd = NativeRuntime::new()
        .cwd()
        .context("Failed to get current directory")?;
    match Settings::discover(&cwd)? {
        Some((path, settings)) => {
            debug!(path = %path.display(), "Using settings file");
            Ok(settings)
        }
        None => {
            debug!("No settings file found, using defaults");
            Ok(Settings::default())
        }
    }
}

pub fn build_processor(settings: Settings) -> Result<SassProcessor> {
    SassProcessor::from_settings(settings).context("Failed to configure the stylesheet processor")
}
