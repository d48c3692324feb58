/*
 * sourcemap.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Source maps for compiled stylesheets and the freshness check built on them.
 */

//! Source maps and staleness detection.
//!
//! Each compiled stylesheet gets a companion `<name>.css.map` whose
//! `sources` list every file the compilation read, relative to the entry
//! stylesheet's directory. An artifact is fresh when every listed file
//! still exists and none is newer than the map itself.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sassproc_runtime::SystemRuntime;
use tracing::debug;

use crate::error::{ProcessorError, Result};
use crate::paths::{relative_to, to_slash};
use crate::storage::{Storage, StorageError};

pub const SOURCE_MAP_VERSION: u32 = 3;

/// Source map document (revision 3 layout).
///
/// Only `sources` drives freshness; `mappings` stays empty because the
/// compiler does not report segment positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub source_root: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub mappings: String,
}

impl SourceMap {
    /// Build the map for a compilation of `entry` into `css_name`.
    pub fn for_compilation(css_name: &str, entry: &Path, loaded_files: &[PathBuf]) -> Self {
        let base = entry.parent().unwrap_or(Path::new(""));
        let sources = loaded_files
            .iter()
            .map(|file| to_slash(&relative_to(file, base)))
            .collect();
        Self {
            version: SOURCE_MAP_VERSION,
            file: file_name(css_name).to_string(),
            source_root: String::new(),
            sources,
            names: Vec::new(),
            mappings: String::new(),
        }
    }

    pub fn from_json(name: &str, json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ProcessorError::SourceMap {
            path: name.to_string(),
            message: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ProcessorError::SourceMap {
            path: self.file.clone(),
            message: e.to_string(),
        })
    }
}

fn file_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Comment appended to compiled CSS pointing at its source map.
pub fn source_map_trailer(css_name: &str) -> String {
    format!("\n\n/*# sourceMappingURL={}.map */", file_name(css_name))
}

/// Decides whether a compiled artifact is still valid.
pub struct StalenessOracle<'a> {
    storage: &'a dyn Storage,
    runtime: &'a dyn SystemRuntime,
}

impl<'a> StalenessOracle<'a> {
    pub fn new(storage: &'a dyn Storage, runtime: &'a dyn SystemRuntime) -> Self {
        Self { storage, runtime }
    }

    /// Whether the map `map_name` proves its artifact up to date.
    ///
    /// Dependencies are resolved against `dependency_base_dir`. A missing
    /// map, an unparseable map, a missing dependency, or a dependency newer
    /// than the map all mean stale. An empty `sources` list is always fresh.
    pub fn is_fresh(&self, map_name: &str, dependency_base_dir: &Path) -> Result<bool> {
        let map_mtime = match self.storage.modified_time(map_name) {
            Ok(mtime) => mtime,
            Err(StorageError::NotFound(_)) => {
                debug!(map = map_name, "No source map; stale");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let content = match self.storage.read_to_string(map_name) {
            Ok(content) => content,
            Err(StorageError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let map = match SourceMap::from_json(map_name, &content) {
            Ok(map) => map,
            Err(e) => {
                debug!(map = map_name, error = %e, "Unparseable source map; stale");
                return Ok(false);
            }
        };

        for source in &map.sources {
            let dependency = dependency_base_dir.join(source);
            let mtime = match self.runtime.modified_time(&dependency) {
                Ok(mtime) => mtime,
                Err(e) if e.is_not_found() => {
                    debug!(dependency = %dependency.display(), "Dependency missing; stale");
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            };
            if mtime > map_mtime {
                debug!(dependency = %dependency.display(), "Dependency newer than source map; stale");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileSystemStorage;
    use pretty_assertions::assert_eq;
    use sassproc_runtime::NativeRuntime;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn test_for_compilation_relative_sources() {
        let map = SourceMap::for_compilation(
            "css/main.css",
            Path::new("/p/static/css/main.scss"),
            &[
                PathBuf::from("/p/static/css/main.scss"),
                PathBuf::from("/p/static/css/_part.scss"),
                PathBuf::from("/p/lib/_mixins.scss"),
            ],
        );
        assert_eq!(map.file, "main.css");
        assert_eq!(
            map.sources,
            vec!["main.scss", "_part.scss", "../../lib/_mixins.scss"]
        );

        let json = map.to_json().unwrap();
        assert!(json.contains("\"sourceRoot\""));
        assert_eq!(SourceMap::from_json("x", &json).unwrap(), map);
    }

    #[test]
    fn test_trailer() {
        assert_eq!(
            source_map_trailer("tests/css/main.css"),
            "\n\n/*# sourceMappingURL=main.css.map */"
        );
    }

    struct Fixture {
        _temp: tempfile::TempDir,
        src: PathBuf,
        storage: FileSystemStorage,
        runtime: NativeRuntime,
    }

    fn fixture(sources: &[&str]) -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        for name in sources {
            fs::write(src.join(name), "").unwrap();
        }
        let storage = FileSystemStorage::new(temp.path().join("out"), "/static/");
        let map = SourceMap {
            version: 3,
            file: "main.css".to_string(),
            source_root: String::new(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            names: vec![],
            mappings: String::new(),
        };
        storage
            .save("main.css.map", map.to_json().unwrap().as_bytes())
            .unwrap();

        let past = SystemTime::now() - Duration::from_secs(3600);
        for name in sources {
            set_mtime(&src.join(name), past);
        }
        Fixture {
            _temp: temp,
            src,
            storage,
            runtime: NativeRuntime::new(),
        }
    }

    #[test]
    fn test_fresh_when_dependencies_older() {
        let f = fixture(&["main.scss", "_part.scss"]);
        let oracle = StalenessOracle::new(&f.storage, &f.runtime);
        assert!(oracle.is_fresh("main.css.map", &f.src).unwrap());
    }

    #[test]
    fn test_stale_when_dependency_newer() {
        let f = fixture(&["main.scss", "_part.scss"]);
        set_mtime(
            &f.src.join("_part.scss"),
            SystemTime::now() + Duration::from_secs(3600),
        );
        let oracle = StalenessOracle::new(&f.storage, &f.runtime);
        assert!(!oracle.is_fresh("main.css.map", &f.src).unwrap());
    }

    #[test]
    fn test_stale_when_dependency_missing() {
        let f = fixture(&["main.scss", "_part.scss"]);
        fs::remove_file(f.src.join("_part.scss")).unwrap();
        let oracle = StalenessOracle::new(&f.storage, &f.runtime);
        assert!(!oracle.is_fresh("main.css.map", &f.src).unwrap());
    }

    #[test]
    fn test_stale_without_map_or_with_garbage() {
        let f = fixture(&["main.scss"]);
        let oracle = StalenessOracle::new(&f.storage, &f.runtime);
        assert!(!oracle.is_fresh("other.css.map", &f.src).unwrap());

        f.storage.save("main.css.map", b"not json").unwrap();
        assert!(!oracle.is_fresh("main.css.map", &f.src).unwrap());
    }

    #[test]
    fn test_empty_sources_is_fresh() {
        let f = fixture(&[]);
        let oracle = StalenessOracle::new(&f.storage, &f.runtime);
        assert!(oracle.is_fresh("main.css.map", &f.src).unwrap());
    }
}
