/*
 * loader.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template discovery across ordered search directories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sassproc_core::Settings;
use sassproc_core::paths::{is_safe_logical_path, to_slash};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{TemplateError, TemplateResult};

/// Directory under each application directory that holds its templates.
pub const APP_TEMPLATE_DIR: &str = "templates";

/// A template file read from disk.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    pub name: String,
    pub path: PathBuf,
    pub source: String,
}

/// Loads templates by name from an ordered list of directories.
///
/// The first directory containing the name wins.
#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    dirs: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl TemplateLoader {
    pub fn new(dirs: Vec<PathBuf>, extensions: Vec<String>) -> Self {
        Self { dirs, extensions }
    }

    /// Configured `template-dirs`, then `<app>/templates` for every app that
    /// has one.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut dirs = settings.template_dirs.clone();
        dirs.extend(
            settings
                .app_dirs
                .iter()
                .map(|app| app.join(APP_TEMPLATE_DIR))
                .filter(|dir| dir.is_dir()),
        );
        Self::new(dirs, settings.template_extensions.clone())
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Locate `name` without reading it.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        if !is_safe_logical_path(name) {
            return None;
        }
        self.dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    pub fn load(&self, name: &str) -> TemplateResult<LoadedTemplate> {
        let path = self
            .find(name)
            .ok_or_else(|| TemplateError::TemplateNotFound {
                name: name.to_string(),
            })?;
        debug!(template = name, path = %path.display(), "Loading template");
        let bytes = std::fs::read(&path)?;
        let source = String::from_utf8(bytes).map_err(|e| TemplateError::Decode {
            template: name.to_string(),
            message: e.to_string(),
        })?;
        Ok(LoadedTemplate {
            name: name.to_string(),
            path,
            source,
        })
    }

    fn has_template_extension(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|ext| file_name.ends_with(ext.as_str()))
    }

    /// Every template name reachable through the loader, sorted, with the
    /// file it resolves to. Shadowed files in later directories are skipped.
    pub fn list(&self) -> Vec<(String, PathBuf)> {
        let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
        for dir in &self.dirs {
            for entry in WalkDir::new(dir)
                .follow_links(true)
                .into_iter()
                .filter_map(Result::ok)
            {
                let path = entry.path();
                if !entry.file_type().is_file() || !self.has_template_extension(path) {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(dir) else {
                    continue;
                };
                found
                    .entry(to_slash(relative))
                    .or_insert_with(|| path.to_path_buf());
            }
        }
        found.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_first_directory_wins() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        write(&first.join("base.html"), b"first");
        write(&second.join("base.html"), b"second");
        write(&second.join("pages/home.html"), b"home");
        write(&second.join("notes.txt"), b"not a template");

        let loader = TemplateLoader::new(vec![first.clone(), second], vec![".html".to_string()]);
        assert_eq!(loader.load("base.html").unwrap().source, "first");

        let names: Vec<String> = loader.list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["base.html", "pages/home.html"]);
        assert_eq!(loader.list()[0].1, first.join("base.html"));
    }

    #[test]
    fn test_load_errors() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("bad.html"), &[0xff, 0xfe, 0x00]);
        let loader = TemplateLoader::new(vec![tmp.path().to_path_buf()], vec![".html".to_string()]);

        assert!(matches!(
            loader.load("missing.html"),
            Err(TemplateError::TemplateNotFound { .. })
        ));
        assert!(matches!(
            loader.load("bad.html"),
            Err(TemplateError::Decode { .. })
        ));
        assert!(loader.find("../bad.html").is_none());
    }

    #[test]
    fn test_from_settings_adds_app_templates() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("blog/templates/post.html"), b"post");
        fs::create_dir_all(tmp.path().join("shop")).unwrap();
        let settings = Settings::from_yaml(
            "template-dirs: [templates]\napp-dirs: [blog, shop]",
            tmp.path(),
        )
        .unwrap();

        let loader = TemplateLoader::from_settings(&settings);
        assert_eq!(
            loader.dirs(),
            &[
                tmp.path().join("templates"),
                tmp.path().join("blog").join("templates")
            ]
        );
        assert_eq!(loader.load("post.html").unwrap().source, "post");
    }
}
