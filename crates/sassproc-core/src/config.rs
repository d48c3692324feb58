/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Settings for the asset pipeline.
 */

//! Settings discovery and resolution.
//!
//! Settings live in a `sassproc.yml` file that is discovered by walking up
//! from a starting directory. Relative paths inside the file resolve against
//! the directory that contains it. [`ProcessorOptions`] is the immutable view
//! the compilation engine works from; it is resolved once per context.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ProcessorError, Result};
use crate::paths::SASS_EXTENSIONS;

/// Names probed when discovering a settings file, in order.
pub const SETTINGS_FILE_NAMES: &[&str] = &["sassproc.yml", "sassproc.yaml"];

/// Default pattern recognising partial (include-only) stylesheets.
pub const DEFAULT_AUTO_INCLUDE_PATTERN: &str = r"^_.+\.(scss|sass)$";

/// Directory inside each application that holds its static assets.
pub const APP_STATIC_DIR: &str = "static";

/// Output style requested from the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    Nested,
    Compact,
    Compressed,
    Expanded,
}

impl OutputStyle {
    /// Default style for a debug or production deployment.
    pub fn default_for(debug: bool) -> Self {
        if debug {
            OutputStyle::Nested
        } else {
            OutputStyle::Compressed
        }
    }

    /// Whether grass should emit compressed output for this style.
    ///
    /// grass only knows expanded and compressed output, so `nested` is
    /// rendered expanded and `compact` is rendered compressed.
    pub fn is_minified(&self) -> bool {
        matches!(self, OutputStyle::Compact | OutputStyle::Compressed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStyle::Nested => "nested",
            OutputStyle::Compact => "compact",
            OutputStyle::Compressed => "compressed",
            OutputStyle::Expanded => "expanded",
        }
    }
}

impl FromStr for OutputStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nested" => Ok(OutputStyle::Nested),
            "compact" => Ok(OutputStyle::Compact),
            "compressed" => Ok(OutputStyle::Compressed),
            "expanded" => Ok(OutputStyle::Expanded),
            _ => Err(format!("Unknown output style: {}", s)),
        }
    }
}

/// A directory searched by the filesystem finder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StaticDir {
    /// Files are addressed relative to the directory itself.
    Path(PathBuf),
    /// Files are addressed as `<prefix>/<relative path>`.
    Prefixed { prefix: String, path: PathBuf },
}

impl StaticDir {
    pub fn prefix(&self) -> &str {
        match self {
            StaticDir::Path(_) => "",
            StaticDir::Prefixed { prefix, .. } => prefix,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            StaticDir::Path(path) => path,
            StaticDir::Prefixed { path, .. } => path,
        }
    }

    fn resolved(&self, base: &Path) -> Self {
        match self {
            StaticDir::Path(path) => StaticDir::Path(base.join(path)),
            StaticDir::Prefixed { prefix, path } => StaticDir::Prefixed {
                prefix: prefix.clone(),
                path: base.join(path),
            },
        }
    }
}

/// Storage backend selection plus backend-specific options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case", rename_all_fields = "kebab-case")]
pub enum StorageSettings {
    /// Plain files below a root directory.
    Filesystem {
        #[serde(default)]
        location: Option<PathBuf>,
        #[serde(default)]
        base_url: Option<String>,
    },
    /// Objects in a cloud bucket, written through a host-supplied client.
    Object {
        bucket: String,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
    },
    /// Files plus content-hashed copies tracked in a manifest.
    Manifest {
        #[serde(default)]
        location: Option<PathBuf>,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        manifest_name: Option<String>,
    },
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings::Filesystem {
            location: None,
            base_url: None,
        }
    }
}

impl StorageSettings {
    pub fn backend_name(&self) -> &'static str {
        match self {
            StorageSettings::Filesystem { .. } => "filesystem",
            StorageSettings::Object { .. } => "object",
            StorageSettings::Manifest { .. } => "manifest",
        }
    }
}

/// External command that filters compiled CSS (stdin to stdout).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PostProcessSettings {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Everything recognised in `sassproc.yml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_static_url")]
    pub static_url: String,
    #[serde(default)]
    pub static_root: Option<PathBuf>,
    /// Root for compiled output; falls back to `static_root`.
    #[serde(default)]
    pub processor_root: Option<PathBuf>,
    /// Compile on demand; falls back to `debug`.
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub output_style: Option<OutputStyle>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default = "default_true")]
    pub auto_include: bool,
    #[serde(default = "default_auto_include_pattern")]
    pub auto_include_pattern: String,
    #[serde(default)]
    pub fail_silently: bool,
    #[serde(default)]
    pub staticfiles_dirs: Vec<StaticDir>,
    #[serde(default)]
    pub app_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub template_dirs: Vec<PathBuf>,
    #[serde(default = "default_template_extensions")]
    pub template_extensions: Vec<String>,
    #[serde(default)]
    pub source_dirs: Vec<PathBuf>,
    #[serde(default = "default_trigger_function")]
    pub trigger_function: String,
    #[serde(default)]
    pub storage: StorageSettings,
    /// Compiler-visible function name to host callable id.
    #[serde(default)]
    pub functions: BTreeMap<String, String>,
    /// Free-form values readable from stylesheets via `get-setting`.
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub postprocess: Option<PostProcessSettings>,
}

fn default_static_url() -> String {
    "/static/".to_string()
}

fn default_true() -> bool {
    true
}

fn default_auto_include_pattern() -> String {
    DEFAULT_AUTO_INCLUDE_PATTERN.to_string()
}

fn default_template_extensions() -> Vec<String> {
    vec![".html".to_string()]
}

fn default_trigger_function() -> String {
    "sass_processor".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            static_url: default_static_url(),
            static_root: None,
            processor_root: None,
            enabled: None,
            output_style: None,
            precision: None,
            include_dirs: Vec::new(),
            auto_include: true,
            auto_include_pattern: default_auto_include_pattern(),
            fail_silently: false,
            staticfiles_dirs: Vec::new(),
            app_dirs: Vec::new(),
            template_dirs: Vec::new(),
            template_extensions: default_template_extensions(),
            source_dirs: Vec::new(),
            trigger_function: default_trigger_function(),
            storage: StorageSettings::default(),
            functions: BTreeMap::new(),
            settings: BTreeMap::new(),
            postprocess: None,
        }
    }
}

impl Settings {
    /// Parse settings from YAML text, resolving relative paths against `base_dir`.
    pub fn from_yaml(content: &str, base_dir: &Path) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)
            .map_err(|e| ProcessorError::Config(format!("Failed to parse settings: {}", e)))?;
        Ok(settings.resolve_paths(base_dir))
    }

    /// Load settings from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProcessorError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        Self::from_yaml(&content, base_dir).map_err(|e| match e {
            ProcessorError::Config(msg) => {
                ProcessorError::Config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Search for a settings file in `start_dir` and its parents.
    pub fn discover(start_dir: &Path) -> Result<Option<(PathBuf, Self)>> {
        for dir in start_dir.ancestors() {
            for name in SETTINGS_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    debug!(path = %candidate.display(), "Found settings file");
                    let settings = Self::load(&candidate)?;
                    return Ok(Some((candidate, settings)));
                }
            }
        }
        Ok(None)
    }

    /// Whether on-demand compilation is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(self.debug)
    }

    /// Effective output style.
    pub fn effective_output_style(&self) -> OutputStyle {
        self.output_style
            .unwrap_or_else(|| OutputStyle::default_for(self.debug))
    }

    /// Root directory for compiled output.
    pub fn effective_processor_root(&self) -> Option<&Path> {
        self.processor_root
            .as_deref()
            .or(self.static_root.as_deref())
    }

    fn resolve_paths(mut self, base: &Path) -> Self {
        let join = |p: &PathBuf| base.join(p);
        self.static_root = self.static_root.as_ref().map(join);
        self.processor_root = self.processor_root.as_ref().map(join);
        self.include_dirs = self.include_dirs.iter().map(join).collect();
        self.app_dirs = self.app_dirs.iter().map(join).collect();
        self.template_dirs = self.template_dirs.iter().map(join).collect();
        self.source_dirs = self.source_dirs.iter().map(join).collect();
        self.staticfiles_dirs = self
            .staticfiles_dirs
            .iter()
            .map(|d| d.resolved(base))
            .collect();
        self.storage = match self.storage {
            StorageSettings::Filesystem { location, base_url } => StorageSettings::Filesystem {
                location: location.as_ref().map(join),
                base_url,
            },
            StorageSettings::Manifest {
                location,
                base_url,
                manifest_name,
            } => StorageSettings::Manifest {
                location: location.as_ref().map(join),
                base_url,
                manifest_name,
            },
            object @ StorageSettings::Object { .. } => object,
        };
        self
    }
}

/// Immutable compilation options resolved from [`Settings`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorOptions {
    /// Public URL prefix for pass-through and disabled-mode URLs.
    pub static_url: String,
    pub enabled: bool,
    pub output_style: OutputStyle,
    pub precision: Option<u32>,
    /// Ordered include search path; first match wins.
    pub include_paths: Vec<PathBuf>,
    pub fail_silently: bool,
}

impl ProcessorOptions {
    /// Resolve options, including auto-discovered application include dirs.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut include_paths = settings.include_dirs.clone();
        if settings.auto_include {
            for dir in app_include_dirs(&settings.app_dirs, &settings.auto_include_pattern)? {
                if !include_paths.contains(&dir) {
                    include_paths.push(dir);
                }
            }
        }

        Ok(Self {
            static_url: settings.static_url.clone(),
            enabled: settings.is_enabled(),
            output_style: settings.effective_output_style(),
            precision: settings.precision,
            include_paths,
            fail_silently: settings.fail_silently,
        })
    }
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            static_url: default_static_url(),
            enabled: true,
            output_style: OutputStyle::Nested,
            precision: None,
            include_paths: Vec::new(),
            fail_silently: false,
        }
    }
}

/// Find application static directories that contain partial stylesheets.
///
/// Each `<app>/static` directory is walked; the first file whose name
/// matches `pattern` (and carries a SASS extension) qualifies the whole
/// directory as an include path.
pub fn app_include_dirs(app_dirs: &[PathBuf], pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = Regex::new(pattern).map_err(|e| {
        ProcessorError::Config(format!("Invalid auto-include-pattern {:?}: {}", pattern, e))
    })?;

    let mut found = Vec::new();
    for app in app_dirs {
        let static_dir = app.join(APP_STATIC_DIR);
        if !static_dir.is_dir() {
            continue;
        }
        let has_partial = WalkDir::new(&static_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .any(|e| {
                let name = e.file_name().to_string_lossy();
                let is_sass = e
                    .path()
                    .extension()
                    .and_then(|x| x.to_str())
                    .is_some_and(|x| SASS_EXTENSIONS.contains(&x));
                is_sass && matcher.is_match(&name)
            });
        if has_partial {
            debug!(dir = %static_dir.display(), "Adding application include directory");
            found.push(static_dir);
        }
    }
    Ok(found)
}
