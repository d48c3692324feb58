/*
 * filesystem.rs
 * Copyright (c) 2025 Posit, PBC
 */

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::trace;

use super::{Storage, StorageError, StorageResult, check_name};
use crate::paths::join_url;

/// Storage backed by plain files below `location`.
///
/// Saves go through a sibling temporary file followed by a rename, so a
/// reader never observes a half-written artifact.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    location: PathBuf,
    base_url: String,
}

impl FileSystemStorage {
    pub fn new(location: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            base_url: base_url.into(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute path for a logical name.
    pub fn path(&self, name: &str) -> StorageResult<PathBuf> {
        check_name(name)?;
        Ok(self.location.join(name))
    }
}

impl Storage for FileSystemStorage {
    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.path(name)?.is_file())
    }

    fn open(&self, name: &str) -> StorageResult<Box<dyn Read + Send>> {
        let file = fs::File::open(self.path(name)?).map_err(|e| StorageError::io(name, e))?;
        Ok(Box::new(file))
    }

    fn save(&self, name: &str, content: &[u8]) -> StorageResult<()> {
        let path = self.path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(name, e))?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let partial = path.with_file_name(format!(".{}.partial", file_name));
        fs::write(&partial, content).map_err(|e| StorageError::io(name, e))?;
        if let Err(e) = fs::rename(&partial, &path) {
            let _ = fs::remove_file(&partial);
            return Err(StorageError::io(name, e));
        }
        trace!(path = %path.display(), bytes = content.len(), "Saved file");
        Ok(())
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        match fs::remove_file(self.path(name)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(name, e)),
        }
    }

    fn url(&self, name: &str) -> String {
        join_url(&self.base_url, name)
    }

    fn modified_time(&self, name: &str) -> StorageResult<SystemTime> {
        fs::metadata(self.path(name)?)
            .and_then(|m| m.modified())
            .map_err(|e| StorageError::io(name, e))
    }

    fn overwrites_in_place(&self) -> bool {
        true
    }

    fn local_path(&self, name: &str) -> Option<PathBuf> {
        self.path(name).ok()
    }
}
