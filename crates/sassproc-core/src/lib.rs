//! sassproc-core: incremental SASS/SCSS compilation for static-asset pipelines.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This crate holds everything between a logical asset path and a served
//! stylesheet URL:
//!
//! - **Settings** (`config`): `sassproc.yml` discovery and resolution
//! - **Storage** (`storage`): filesystem, object-store and manifest backends
//! - **Finders** (`finders`): logical path to source file lookup
//! - **Source maps** (`sourcemap`): dependency lists and the freshness check
//! - **Functions** (`functions`): host functions callable from stylesheets
//! - **Compiler** (`compiler`): the grass-backed compiler seam
//! - **Processor** (`processor`): the on-demand compilation engine
//!
//! # Example
//!
//! ```ignore
//! use sassproc_core::{SassProcessor, Settings};
//!
//! let settings = Settings::load(Path::new("sassproc.yml"))?;
//! let processor = SassProcessor::from_settings(settings)?;
//! let url = processor.resolve("shop/css/main.scss")?;
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod finders;
pub mod functions;
mod lexical;
pub mod paths;
pub mod postprocess;
pub mod processor;
pub mod sourcemap;
pub mod storage;

pub use compiler::{CompileRequest, CompiledCss, Compiler, GrassCompiler};
pub use config::{OutputStyle, ProcessorOptions, Settings, StaticDir, StorageSettings};
pub use error::{ProcessorError, Result};
pub use finders::{AppDirectoriesFinder, CompiledCssFinder, FileSystemFinder, Finder, FinderChain};
pub use functions::{CallableLoader, FunctionTable, FunctionValue, HostFunction, RegistryLoader};
pub use processor::{ProcessorBuilder, SassProcessor};
pub use sourcemap::{SourceMap, StalenessOracle};
pub use storage::{
    FileSystemStorage, LazyStorage, ManifestStorage, MemoryObjectStore, ObjectStorage, ObjectStore,
    Storage, StorageError,
};
