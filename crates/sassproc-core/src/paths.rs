//! Logical asset path helpers.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Logical paths are `/`-separated, relative to the project-wide static
//! root, and never contain `..`. Everything here is purely lexical.

use std::path::{Component, Path, PathBuf};

pub use sassproc_runtime::sass_native::normalize_path;

/// Extensions recognised as SASS/SCSS sources.
pub const SASS_EXTENSIONS: &[&str] = &["scss", "sass"];

/// Whether a logical or physical path names a SASS/SCSS source.
pub fn is_sass_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SASS_EXTENSIONS.contains(&ext))
}

/// Whether a logical path is safe to look up (relative, no `..`).
pub fn is_safe_logical_path(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Rewrite the extension of a logical path to `.css`.
///
/// `tests/css/main.scss` becomes `tests/css/main.css`.
pub fn css_name_for(path: &str) -> String {
    match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => format!("{}.css", &path[..dot]),
        _ => format!("{}.css", path),
    }
}

/// Name of the source map companion for a compiled CSS artifact.
pub fn source_map_name_for(css_name: &str) -> String {
    format!("{}.map", css_name)
}

/// Join a logical path onto a public URL prefix.
///
/// Absolute URLs and absolute paths are returned unchanged.
pub fn join_url(prefix: &str, path: &str) -> String {
    if path.starts_with('/') || path.contains("://") {
        return path.to_string();
    }
    if prefix.is_empty() {
        return path.to_string();
    }
    if prefix.ends_with('/') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}/{}", prefix, path)
    }
}

/// Express `target` relative to the directory `base`.
///
/// Both paths are normalized first; components that cannot be shared are
/// climbed out of with `..`.
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target = normalize_path(target);
    let base = normalize_path(base);

    let target_components: Vec<_> = target.components().collect();
    let base_components: Vec<_> = base.components().collect();

    let common = target_components
        .iter()
        .zip(base_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_components.len() {
        relative.push("..");
    }
    for component in &target_components[common..] {
        relative.push(component.as_os_str());
    }
    relative
}

/// Render a relative path with `/` separators for use in JSON and URLs.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
