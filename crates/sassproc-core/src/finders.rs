/*
 * finders.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Logical path to physical file resolution.
 */

//! Static file finders.
//!
//! A [`Finder`] maps a logical asset path such as `shop/css/main.scss` to a
//! file on disk. A [`FinderChain`] queries its finders in registration
//! order and returns the first hit.

use std::collections::HashSet;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tracing::trace;
use walkdir::WalkDir;

use crate::config::{APP_STATIC_DIR, Settings, StaticDir};
use crate::paths::{is_safe_logical_path, to_slash};

/// Strategy for locating static files.
pub trait Finder: Send + Sync + Debug {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Physical location of `logical_path`, if this finder knows it.
    fn find(&self, logical_path: &str) -> Option<PathBuf>;

    /// Every `(logical path, physical path)` pair this finder can serve.
    fn list(&self) -> Vec<(String, PathBuf)>;
}

/// Check if a directory entry should be skipped while listing.
fn is_ignored(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with('.') || name.ends_with('~'))
}

fn list_dir(prefix: &str, root: &Path) -> Vec<(String, PathBuf)> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e.path()))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = to_slash(relative);
        let logical = if prefix.is_empty() {
            relative
        } else {
            format!("{}/{}", prefix, relative)
        };
        found.push((logical, entry.path().to_path_buf()));
    }
    found
}

/// Finds files in an explicit list of directories, optionally namespaced
/// by a prefix.
#[derive(Debug, Clone, Default)]
pub struct FileSystemFinder {
    dirs: Vec<StaticDir>,
}

impl FileSystemFinder {
    pub fn new(dirs: Vec<StaticDir>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[StaticDir] {
        &self.dirs
    }
}

impl Finder for FileSystemFinder {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn find(&self, logical_path: &str) -> Option<PathBuf> {
        if !is_safe_logical_path(logical_path) {
            return None;
        }
        for dir in &self.dirs {
            let prefix = dir.prefix();
            let relative = if prefix.is_empty() {
                logical_path
            } else {
                match logical_path
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('/'))
                {
                    Some(rest) => rest,
                    None => continue,
                }
            };
            let candidate = dir.path().join(relative);
            if candidate.is_file() {
                trace!(path = logical_path, found = %candidate.display(), "filesystem finder hit");
                return Some(candidate);
            }
        }
        None
    }

    fn list(&self) -> Vec<(String, PathBuf)> {
        self.dirs
            .iter()
            .filter(|d| d.path().is_dir())
            .flat_map(|d| list_dir(d.prefix(), d.path()))
            .collect()
    }
}

/// Finds files in the `static` directory of each application.
#[derive(Debug, Clone, Default)]
pub struct AppDirectoriesFinder {
    inner: FileSystemFinder,
}

impl AppDirectoriesFinder {
    pub fn new(app_dirs: &[PathBuf]) -> Self {
        let dirs = app_dirs
            .iter()
            .map(|app| app.join(APP_STATIC_DIR))
            .filter(|dir| dir.is_dir())
            .map(StaticDir::Path)
            .collect();
        Self {
            inner: FileSystemFinder::new(dirs),
        }
    }
}

impl Finder for AppDirectoriesFinder {
    fn name(&self) -> &'static str {
        "app-directories"
    }

    fn find(&self, logical_path: &str) -> Option<PathBuf> {
        self.inner.find(logical_path)
    }

    fn list(&self) -> Vec<(String, PathBuf)> {
        self.inner.list()
    }
}

/// Finds stylesheets compiled into the processor root.
///
/// Only `.css` and `.css.map` names are served, and `list()` is always
/// empty: the collection pass must not see compiled output twice.
#[derive(Debug, Clone)]
pub struct CompiledCssFinder {
    root: Option<PathBuf>,
}

impl CompiledCssFinder {
    pub fn new(root: Option<PathBuf>) -> Self {
        let root = root.filter(|r| r.is_dir());
        Self { root }
    }
}

impl Finder for CompiledCssFinder {
    fn name(&self) -> &'static str {
        "compiled-css"
    }

    fn find(&self, logical_path: &str) -> Option<PathBuf> {
        if !(logical_path.ends_with(".css") || logical_path.ends_with(".css.map")) {
            return None;
        }
        if !is_safe_logical_path(logical_path) {
            return None;
        }
        let candidate = self.root.as_ref()?.join(logical_path);
        candidate.is_file().then_some(candidate)
    }

    fn list(&self) -> Vec<(String, PathBuf)> {
        Vec::new()
    }
}

/// Ordered collection of finders. First match wins.
#[derive(Debug, Default)]
pub struct FinderChain {
    finders: Vec<Box<dyn Finder>>,
}

impl FinderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard chain: configured directories, application directories,
    /// then compiled output.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .with(FileSystemFinder::new(settings.staticfiles_dirs.clone()))
            .with(AppDirectoriesFinder::new(&settings.app_dirs))
            .with(CompiledCssFinder::new(
                settings.effective_processor_root().map(Path::to_path_buf),
            ))
    }

    pub fn with(mut self, finder: impl Finder + 'static) -> Self {
        self.push(Box::new(finder));
        self
    }

    pub fn push(&mut self, finder: Box<dyn Finder>) {
        self.finders.push(finder);
    }

    pub fn len(&self) -> usize {
        self.finders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finders.is_empty()
    }

    pub fn find(&self, logical_path: &str) -> Option<PathBuf> {
        if !is_safe_logical_path(logical_path) {
            return None;
        }
        self.finders.iter().find_map(|f| f.find(logical_path))
    }

    /// Name of the finder that resolves `logical_path`, with the location.
    pub fn find_with_source(&self, logical_path: &str) -> Option<(&'static str, PathBuf)> {
        if !is_safe_logical_path(logical_path) {
            return None;
        }
        self.finders
            .iter()
            .find_map(|f| f.find(logical_path).map(|p| (f.name(), p)))
    }

    /// Every servable file, deduplicated by logical path (earlier finders win).
    pub fn list(&self) -> Vec<(String, PathBuf)> {
        let mut seen = HashSet::new();
        self.finders
            .iter()
            .flat_map(|f| f.list())
            .filter(|(logical, _)| seen.insert(logical.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_filesystem_finder_with_prefix() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("static/css/main.scss"));
        touch(&temp.path().join("vendor/lib.scss"));

        let finder = FileSystemFinder::new(vec![
            StaticDir::Path(temp.path().join("static")),
            StaticDir::Prefixed {
                prefix: "third".to_string(),
                path: temp.path().join("vendor"),
            },
        ]);

        assert_eq!(
            finder.find("css/main.scss"),
            Some(temp.path().join("static/css/main.scss"))
        );
        assert_eq!(
            finder.find("third/lib.scss"),
            Some(temp.path().join("vendor/lib.scss"))
        );
        assert_eq!(finder.find("lib.scss"), None);
        assert_eq!(finder.find("../static/css/main.scss"), None);

        let logical: Vec<_> = finder.list().into_iter().map(|(l, _)| l).collect();
        assert_eq!(logical, vec!["css/main.scss", "third/lib.scss"]);
    }

    #[test]
    fn test_list_skips_hidden_files() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("a.scss"));
        touch(&temp.path().join(".hidden/b.scss"));
        touch(&temp.path().join("c.scss~"));

        let finder = FileSystemFinder::new(vec![StaticDir::Path(temp.path().to_path_buf())]);
        let logical: Vec<_> = finder.list().into_iter().map(|(l, _)| l).collect();
        assert_eq!(logical, vec!["a.scss"]);
    }

    #[test]
    fn test_app_directories_finder() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("shop/static/shop/main.scss"));

        let finder = AppDirectoriesFinder::new(&[temp.path().join("shop"), temp.path().join("none")]);
        assert_eq!(
            finder.find("shop/main.scss"),
            Some(temp.path().join("shop/static/shop/main.scss"))
        );
    }

    #[test]
    fn test_compiled_css_finder_only_serves_css() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("css/main.css"));
        touch(&temp.path().join("css/main.css.map"));
        touch(&temp.path().join("css/main.scss"));

        let finder = CompiledCssFinder::new(Some(temp.path().to_path_buf()));
        assert!(finder.find("css/main.css").is_some());
        assert!(finder.find("css/main.css.map").is_some());
        assert_eq!(finder.find("css/main.scss"), None);
        assert!(finder.list().is_empty());

        assert_eq!(CompiledCssFinder::new(None).find("css/main.css"), None);
    }

    #[test]
    fn test_chain_order_and_dedup() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("first/css/a.scss"));
        touch(&temp.path().join("second/css/a.scss"));
        touch(&temp.path().join("second/css/b.scss"));

        let chain = FinderChain::new()
            .with(FileSystemFinder::new(vec![StaticDir::Path(temp.path().join("first"))]))
            .with(FileSystemFinder::new(vec![StaticDir::Path(temp.path().join("second"))]));

        assert_eq!(
            chain.find("css/a.scss"),
            Some(temp.path().join("first/css/a.scss"))
        );
        let listed = chain.list();
        assert_eq!(
            listed,
            vec![
                ("css/a.scss".to_string(), temp.path().join("first/css/a.scss")),
                ("css/b.scss".to_string(), temp.path().join("second/css/b.scss")),
            ]
        );
        assert_eq!(chain.find("/etc/passwd"), None);
    }

    #[test]
    fn test_chain_from_settings() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("static/main.scss"));
        touch(&temp.path().join("out/main.css"));

        let yaml = "staticfiles-dirs: [static]\nstatic-root: out";
        let settings = Settings::from_yaml(yaml, temp.path()).unwrap();
        let chain = FinderChain::from_settings(&settings);

        assert_eq!(chain.len(), 3);
        assert_eq!(
            chain.find_with_source("main.css"),
            Some(("compiled-css", temp.path().join("out/main.css")))
        );
        assert_eq!(
            chain.find_with_source("main.scss"),
            Some(("filesystem", temp.path().join("static/main.scss")))
        );
    }
}
