//! sassproc-offline: compile every stylesheet a project references, ahead
//! of time.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Two scans find the references:
//!
//! - the template scan parses every template with each selected template
//!   language and collects literal `sass_src` paths
//! - the source scan parses Rust files under `source-dirs` and collects
//!   paths passed to the configured trigger function
//!
//! [`BatchDriver`] then compiles each distinct stylesheet once, either next
//! to its source or into the configured storage, or removes the artifacts.
//! Problems with individual files are logged and reported, never fatal.

pub mod driver;
pub mod error;
pub mod reference;
pub mod sources;
pub mod templates;

pub use driver::{BatchDriver, BatchOptions, BatchReport, Destination, Discovery, side_by_side_css};
pub use error::{BatchError, BatchResult};
pub use reference::{BatchFailure, Reference};
pub use sources::{SourceScan, scan_source, scan_sources};
pub use templates::{TemplateScan, scan_templates};
