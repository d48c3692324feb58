/*
 * processor.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The compilation engine.
 */

//! On-demand stylesheet compilation.
//!
//! [`SassProcessor::resolve`] turns a logical asset path into a public URL,
//! compiling the stylesheet first when its artifact is missing or stale.
//! A processor is built once from [`Settings`] and shared by every caller;
//! it owns the storage handle, the finder chain and the function table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sassproc_runtime::{SharedRuntime, shared_default_runtime};
use tracing::{debug, error, info};

use crate::compiler::{CompileRequest, CompiledCss, Compiler, GrassCompiler};
use crate::config::{ProcessorOptions, Settings};
use crate::error::{ProcessorError, Result};
use crate::finders::FinderChain;
use crate::functions::{CallableLoader, FunctionTable};
use crate::paths::{css_name_for, is_sass_path, join_url, source_map_name_for};
use crate::postprocess::PostProcessor;
use crate::sourcemap::{StalenessOracle, source_map_trailer};
use crate::storage::{LazyStorage, ObjectStore, Storage};

/// Builds a [`SassProcessor`], filling anything not supplied from settings.
pub struct ProcessorBuilder {
    settings: Settings,
    runtime: Option<SharedRuntime>,
    storage: Option<Arc<dyn Storage>>,
    object_client: Option<Arc<dyn ObjectStore>>,
    compiler: Option<Arc<dyn Compiler>>,
    loader: Option<Arc<dyn CallableLoader>>,
    finders: Option<FinderChain>,
}

impl ProcessorBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            runtime: None,
            storage: None,
            object_client: None,
            compiler: None,
            loader: None,
            finders: None,
        }
    }

    pub fn runtime(mut self, runtime: SharedRuntime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Use `storage` instead of the backend selected in settings.
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Client for the `object` storage backend.
    pub fn object_client(mut self, client: Arc<dyn ObjectStore>) -> Self {
        self.object_client = Some(client);
        self
    }

    pub fn compiler(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Loader used to resolve `functions:` entries.
    pub fn callable_loader(mut self, loader: Arc<dyn CallableLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn finders(mut self, finders: FinderChain) -> Self {
        self.finders = Some(finders);
        self
    }

    pub fn build(self) -> Result<SassProcessor> {
        let options = ProcessorOptions::from_settings(&self.settings)?;
        let functions = FunctionTable::from_settings(&self.settings, self.loader.as_deref())?;
        let runtime = self.runtime.unwrap_or_else(shared_default_runtime);
        let storage = match self.storage {
            Some(storage) => storage,
            None => Arc::new(LazyStorage::from_settings(
                self.settings.clone(),
                self.object_client,
            )),
        };
        let compiler = self
            .compiler
            .unwrap_or_else(|| Arc::new(GrassCompiler::new(runtime.clone())));
        let finders = self
            .finders
            .unwrap_or_else(|| FinderChain::from_settings(&self.settings));
        let postprocessor = self
            .settings
            .postprocess
            .clone()
            .map(|p| PostProcessor::new(p, runtime.clone()));

        debug!(
            enabled = options.enabled,
            style = options.output_style.as_str(),
            include_paths = options.include_paths.len(),
            functions = ?functions.names(),
            "Processor configured"
        );

        Ok(SassProcessor {
            settings: self.settings,
            options,
            runtime,
            storage,
            compiler,
            functions,
            finders,
            postprocessor,
            locks: Mutex::new(HashMap::new()),
        })
    }
}

/// The compilation engine.
pub struct SassProcessor {
    settings: Settings,
    options: ProcessorOptions,
    runtime: SharedRuntime,
    storage: Arc<dyn Storage>,
    compiler: Arc<dyn Compiler>,
    functions: FunctionTable,
    finders: FinderChain,
    postprocessor: Option<PostProcessor>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for SassProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SassProcessor")
            .field("options", &self.options)
            .field("storage", &self.storage)
            .field("functions", &self.functions)
            .field("finders", &self.finders)
            .finish_non_exhaustive()
    }
}

impl SassProcessor {
    pub fn builder(settings: Settings) -> ProcessorBuilder {
        ProcessorBuilder::new(settings)
    }

    /// Processor with every collaborator taken from `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        ProcessorBuilder::new(settings).build()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn finders(&self) -> &FinderChain {
        &self.finders
    }

    pub fn runtime(&self) -> &SharedRuntime {
        &self.runtime
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Physical location of a logical path.
    pub fn find_source(&self, logical_path: &str) -> Result<PathBuf> {
        self.finders
            .find(logical_path)
            .ok_or_else(|| ProcessorError::not_found(logical_path))
    }

    /// Public URL for `logical_path`, compiling it first when needed.
    ///
    /// Paths that are not stylesheets are returned joined to the static URL
    /// prefix. With compilation disabled, the URL of the expected CSS file is
    /// returned without touching storage.
    pub fn resolve(&self, logical_path: &str) -> Result<String> {
        let source = self.find_source(logical_path)?;
        if !is_sass_path(logical_path) {
            return Ok(join_url(&self.options.static_url, logical_path));
        }

        let css_name = css_name_for(logical_path);
        if !self.options.enabled {
            return Ok(join_url(&self.options.static_url, &css_name));
        }

        let lock = self.artifact_lock(&css_name);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        if self.is_current(&css_name, &source)? {
            debug!(path = logical_path, "Compiled stylesheet is up to date");
        } else {
            self.compile_and_store(&source, &css_name)?;
        }
        Ok(self.storage.url(&css_name))
    }

    /// Compile `logical_path` into storage regardless of freshness.
    pub fn compile_now(&self, logical_path: &str) -> Result<String> {
        let source = self.find_source(logical_path)?;
        if !is_sass_path(logical_path) {
            return Ok(join_url(&self.options.static_url, logical_path));
        }
        let css_name = css_name_for(logical_path);
        let lock = self.artifact_lock(&css_name);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        self.compile_and_store(&source, &css_name)?;
        Ok(self.storage.url(&css_name))
    }

    /// Compile a stylesheet without storing anything.
    ///
    /// When `css_name` is given the result carries a source map; the
    /// `sourceMappingURL` trailer is left to the caller.
    pub fn compile_source(&self, source: &Path, css_name: Option<&str>) -> Result<CompiledCss> {
        let mut compiled = self.compiler.compile(&CompileRequest {
            source,
            include_paths: &self.options.include_paths,
            css_name,
            output_style: self.options.output_style,
            precision: self.options.precision,
            functions: &self.functions,
        })?;
        if let Some(postprocessor) = &self.postprocessor {
            compiled.css = postprocessor.process(compiled.css);
        }
        Ok(compiled)
    }

    /// Remove the compiled CSS and source map for `logical_path`.
    ///
    /// Returns how many of the two artifacts existed.
    pub fn delete_artifacts(&self, logical_path: &str) -> Result<usize> {
        let css_name = css_name_for(logical_path);
        let map_name = source_map_name_for(&css_name);
        let lock = self.artifact_lock(&css_name);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut removed = 0;
        for name in [&css_name, &map_name] {
            if self.storage.exists(name)? {
                self.storage.delete(name)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn is_current(&self, css_name: &str, source: &Path) -> Result<bool> {
        if !self.storage.exists(css_name)? {
            return Ok(false);
        }
        let base_dir = source.parent().unwrap_or(Path::new(""));
        StalenessOracle::new(self.storage.as_ref(), self.runtime.as_ref())
            .is_fresh(&source_map_name_for(css_name), base_dir)
    }

    fn compile_and_store(&self, source: &Path, css_name: &str) -> Result<()> {
        let map_name = source_map_name_for(css_name);
        match self.compile_source(source, Some(css_name)) {
            Ok(compiled) => {
                let mut css = compiled.css;
                if let Some(map) = &compiled.source_map {
                    css.push_str(&source_map_trailer(css_name));
                    self.replace(css_name, css.as_bytes())?;
                    self.replace(&map_name, map.to_json()?.as_bytes())?;
                } else {
                    self.replace(css_name, css.as_bytes())?;
                }
                info!(source = %source.display(), output = css_name, "Compiled stylesheet");
                Ok(())
            }
            Err(e @ ProcessorError::Compile { .. }) if self.options.fail_silently => {
                error!(source = %source.display(), error = %e, "Stylesheet compilation failed");
                self.replace(css_name, e.to_string().as_bytes())?;
                self.storage.delete(&map_name)?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn replace(&self, name: &str, content: &[u8]) -> Result<()> {
        if !self.storage.overwrites_in_place() && self.storage.exists(name)? {
            self.storage.delete(name)?;
        }
        self.storage.save(name, content)?;
        Ok(())
    }

    fn artifact_lock(&self, css_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(css_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileSystemStorage, MemoryObjectStore, ObjectStorage};
    use std::fs;

    fn project(debug: bool) -> (tempfile::TempDir, Settings) {
        let temp = tempfile::tempdir().unwrap();
        let css_dir = temp.path().join("static/tests/css");
        fs::create_dir_all(&css_dir).unwrap();
        fs::write(css_dir.join("main.scss"), ".a { .b { color: red; } }").unwrap();
        fs::write(css_dir.join("plain.css"), ".a{}").unwrap();
        let yaml = format!("debug: {}\nstatic-root: out\nstaticfiles-dirs: [static]", debug);
        let settings = Settings::from_yaml(&yaml, temp.path()).unwrap();
        (temp, settings)
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let (_temp, settings) = project(true);
        let processor = SassProcessor::from_settings(settings).unwrap();
        let err = processor.resolve("tests/css/missing.scss").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Unable to locate file tests/css/missing.scss");
    }

    #[test]
    fn test_object_storage_backend() {
        let (_temp, settings) = project(true);
        let client = Arc::new(MemoryObjectStore::new());
        let storage = Arc::new(ObjectStorage::new(client.clone(), "bucket"));
        let processor = SassProcessor::builder(settings)
            .storage(storage)
            .build()
            .unwrap();

        let url = processor.resolve("tests/css/main.scss").unwrap();
        assert_eq!(url, "https://bucket.s3.amazonaws.com/tests/css/main.css");
        assert_eq!(
            client.keys("bucket"),
            vec!["tests/css/main.css".to_string(), "tests/css/main.css.map".to_string()]
        );
    }

    #[test]
    fn test_delete_artifacts_counts_existing() {
        let (temp, settings) = project(true);
        let processor = SassProcessor::builder(settings)
            .storage(Arc::new(FileSystemStorage::new(temp.path().join("out"), "/static/")))
            .build()
            .unwrap();

        processor.resolve("tests/css/main.scss").unwrap();
        assert_eq!(processor.delete_artifacts("tests/css/main.scss").unwrap(), 2);
        assert_eq!(processor.delete_artifacts("tests/css/main.scss").unwrap(), 0);
    }

    #[test]
    fn test_compile_error_propagates_without_fail_silently() {
        let (temp, settings) = project(true);
        fs::write(temp.path().join("static/tests/css/main.scss"), ".a { b: $nope; }").unwrap();
        let processor = SassProcessor::from_settings(settings).unwrap();
        let err = processor.resolve("tests/css/main.scss").unwrap_err();
        assert!(matches!(err, ProcessorError::Compile { .. }));
        assert!(!temp.path().join("out/tests/css/main.css").exists());
    }
}
