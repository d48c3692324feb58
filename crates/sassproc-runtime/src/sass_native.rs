//! SASS compilation using the grass crate.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This module provides SASS/SCSS compilation using the grass crate, a pure
//! Rust implementation that targets dart-sass 1.54.3.
//!
//! Key components:
//! - `RuntimeFs`: Adapter implementing `grass::Fs` for our `SystemRuntime`
//!   that records every file grass loads
//! - `SourcePreprocessor`: hook applied to each stylesheet as it is read
//! - `compile_file`: High-level function for compiling a stylesheet on disk

use std::cell::RefCell;
use std::fmt::Debug;
use std::io;
use std::path::{Component, Path, PathBuf};

use grass::{Options, OutputStyle};

use crate::traits::{RuntimeError, RuntimeResult, SystemRuntime};

/// Trait for rewriting stylesheet sources before grass parses them.
///
/// The preprocessor sees the entry file and every imported partial, so
/// a rewrite applies uniformly across the whole dependency graph.
pub trait SourcePreprocessor {
    /// Transform the raw bytes of `path`.
    fn preprocess(&self, path: &Path, source: Vec<u8>) -> io::Result<Vec<u8>>;
}

/// Result of compiling one stylesheet.
#[derive(Debug, Clone)]
pub struct SassOutput {
    /// The compiled CSS.
    pub css: String,
    /// Every file grass read, entry file first, normalized and deduplicated.
    pub loaded_files: Vec<PathBuf>,
}

/// Adapter that implements `grass::Fs` using a `SystemRuntime`.
///
/// This allows grass to read files through our runtime abstraction and
/// lets the caller learn the full set of files a compilation depended on.
pub struct RuntimeFs<'a> {
    runtime: &'a dyn SystemRuntime,
    preprocessor: Option<&'a dyn SourcePreprocessor>,
    loaded: RefCell<Vec<PathBuf>>,
}

impl<'a> RuntimeFs<'a> {
    /// Create a new RuntimeFs adapter wrapping the given runtime.
    pub fn new(runtime: &'a dyn SystemRuntime) -> Self {
        Self {
            runtime,
            preprocessor: None,
            loaded: RefCell::new(Vec::new()),
        }
    }

    /// Create a new RuntimeFs that rewrites every file through `preprocessor`.
    pub fn with_preprocessor(
        runtime: &'a dyn SystemRuntime,
        preprocessor: &'a dyn SourcePreprocessor,
    ) -> Self {
        Self {
            runtime,
            preprocessor: Some(preprocessor),
            loaded: RefCell::new(Vec::new()),
        }
    }

    /// Files read so far, in load order.
    pub fn loaded_files(&self) -> Vec<PathBuf> {
        self.loaded.borrow().clone()
    }

    fn record(&self, path: &Path) {
        let normalized = normalize_path(path);
        let mut loaded = self.loaded.borrow_mut();
        if !loaded.contains(&normalized) {
            loaded.push(normalized);
        }
    }
}

impl Debug for RuntimeFs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeFs")
            .field("runtime", &"<SystemRuntime>")
            .field("preprocessor", &self.preprocessor.is_some())
            .field("loaded", &self.loaded.borrow().len())
            .finish()
    }
}

impl grass::Fs for RuntimeFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.runtime.is_dir(path).unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.runtime.is_file(path).unwrap_or(false)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let content = self
            .runtime
            .file_read(path)
            .map_err(|e| io::Error::other(e.to_string()))?;
        self.record(path);
        match self.preprocessor {
            Some(preprocessor) => preprocessor.preprocess(path, content),
            None => Ok(content),
        }
    }
}

/// Compile a stylesheet on disk to CSS using grass.
///
/// # Arguments
///
/// * `runtime` - The runtime to use for file system access
/// * `path` - Absolute path of the `.scss`/`.sass` entry file
/// * `load_paths` - Directories to search for @use/@import resolution, in order
/// * `minified` - Whether to produce compressed output
/// * `preprocessor` - Optional rewrite applied to every loaded stylesheet
///
/// # Returns
///
/// The compiled CSS plus every file the compilation read, or
/// `RuntimeError::SassError` on failure.
pub fn compile_file(
    runtime: &dyn SystemRuntime,
    path: &Path,
    load_paths: &[PathBuf],
    minified: bool,
    preprocessor: Option<&dyn SourcePreprocessor>,
) -> RuntimeResult<SassOutput> {
    let fs = match preprocessor {
        Some(preprocessor) => RuntimeFs::with_preprocessor(runtime, preprocessor),
        None => RuntimeFs::new(runtime),
    };

    let style = if minified {
        OutputStyle::Compressed
    } else {
        OutputStyle::Expanded
    };

    let options = Options::default()
        .fs(&fs)
        .load_paths(load_paths)
        .style(style);

    let css = grass::from_path(path, &options).map_err(|e| RuntimeError::SassError(e.to_string()))?;

    Ok(SassOutput {
        css,
        loaded_files: fs.loaded_files(),
    })
}

/// Lexically normalize a path, resolving `.` and `..` without touching the disk.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NativeRuntime;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_compile_simple_file() {
        let runtime = NativeRuntime::new();
        let temp = tempfile::tempdir().unwrap();
        let entry = write(temp.path(), "main.scss", "$primary: #007bff; .btn { color: $primary; }");

        let output = compile_file(&runtime, &entry, &[], false, None).unwrap();

        assert!(output.css.contains(".btn"));
        assert!(output.css.contains("#007bff"));
        assert_eq!(output.loaded_files, vec![entry]);
    }

    #[test]
    fn test_compile_records_imported_partials() {
        let runtime = NativeRuntime::new();
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "_colors.scss", "$red: #ff0000;");
        let entry = write(
            temp.path(),
            "main.scss",
            "@import 'colors';\n.redbox { background-color: $red; }",
        );

        let output = compile_file(&runtime, &entry, &[temp.path().to_path_buf()], false, None)
            .unwrap();

        assert!(output.css.contains(".redbox"));
        assert_eq!(output.loaded_files.len(), 2);
        assert_eq!(output.loaded_files[0], entry);
        assert!(output.loaded_files[1].ends_with("_colors.scss"));
    }

    #[test]
    fn test_compile_minified() {
        let runtime = NativeRuntime::new();
        let temp = tempfile::tempdir().unwrap();
        let entry = write(temp.path(), "main.scss", "$primary: blue;\n\n.btn {\n  color: $primary;\n}");

        let output = compile_file(&runtime, &entry, &[], true, None).unwrap();

        assert!(!output.css.contains("\n\n"));
        assert!(output.css.contains(".btn"));
    }

    #[test]
    fn test_compile_error() {
        let runtime = NativeRuntime::new();
        let temp = tempfile::tempdir().unwrap();
        let entry = write(temp.path(), "broken.scss", ".btn { color: $undefined-variable; }");

        let err = compile_file(&runtime, &entry, &[], false, None).unwrap_err();
        assert!(matches!(err, RuntimeError::SassError(_)));
    }

    struct Uppercase;

    impl SourcePreprocessor for Uppercase {
        fn preprocess(&self, _path: &Path, source: Vec<u8>) -> io::Result<Vec<u8>> {
            let text = String::from_utf8_lossy(&source).replace("PLACEHOLDER", "red");
            Ok(text.into_bytes())
        }
    }

    #[test]
    fn test_preprocessor_applies_to_every_file() {
        let runtime = NativeRuntime::new();
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "_part.scss", ".part { color: PLACEHOLDER; }");
        let entry = write(temp.path(), "main.scss", "@import 'part';\n.main { color: PLACEHOLDER; }");

        let output = compile_file(
            &runtime,
            &entry,
            &[temp.path().to_path_buf()],
            false,
            Some(&Uppercase),
        )
        .unwrap();

        assert!(!output.css.contains("PLACEHOLDER"));
        assert_eq!(output.css.matches("color: red").count(), 2);
    }

    #[test]
    fn test_runtime_fs_debug() {
        let runtime = NativeRuntime::new();
        let fs = RuntimeFs::new(&runtime);
        let debug_str = format!("{:?}", fs);
        assert!(debug_str.contains("RuntimeFs"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./c/../d.scss")),
            PathBuf::from("/a/b/d.scss")
        );
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    }
}
