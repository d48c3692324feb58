//! Storage backends for compiled artifacts.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A [`Storage`] persists compiled CSS and source maps under logical names
//! (`tests/css/main.css`) and turns those names into public URLs. Backends:
//!
//! - [`FileSystemStorage`]: plain files below a root directory
//! - [`ObjectStorage`]: objects in a bucket, through an injected [`ObjectStore`]
//! - [`ManifestStorage`]: files plus content-hashed copies tracked in a manifest
//! - [`LazyStorage`]: defers building one of the above until first use

mod filesystem;
mod lazy;
mod manifest;
mod object;

use std::fmt::Debug;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;

pub use filesystem::FileSystemStorage;
pub use lazy::{LazyStorage, StorageFactory};
pub use manifest::{DEFAULT_MANIFEST_NAME, ManifestStorage, hashed_name};
pub use object::{MemoryObjectStore, ObjectMeta, ObjectStorage, ObjectStore};

use crate::config::{Settings, StorageSettings};
use crate::paths::is_safe_logical_path;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found in storage: {0}")]
    NotFound(String),

    #[error("Invalid storage name: {0}")]
    InvalidName(String),

    #[error("I/O error on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),

    /// The backend could not be built from settings.
    #[error("{0}")]
    Config(String),
}

impl StorageError {
    pub(crate) fn io(name: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(name.to_string())
        } else {
            StorageError::Io {
                name: name.to_string(),
                source,
            }
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Uniform access to wherever compiled artifacts live.
pub trait Storage: Send + Sync + Debug {
    fn exists(&self, name: &str) -> StorageResult<bool>;

    fn open(&self, name: &str) -> StorageResult<Box<dyn Read + Send>>;

    /// Store `content` under `name`.
    ///
    /// Backends that report `overwrites_in_place() == false` expect the
    /// caller to delete an existing entry first.
    fn save(&self, name: &str, content: &[u8]) -> StorageResult<()>;

    /// Remove `name`. Removing a missing entry is not an error.
    fn delete(&self, name: &str) -> StorageResult<()>;

    /// Public URL for `name`.
    fn url(&self, name: &str) -> String;

    fn modified_time(&self, name: &str) -> StorageResult<SystemTime>;

    /// Whether `save` replaces an existing entry atomically.
    fn overwrites_in_place(&self) -> bool {
        false
    }

    /// Local filesystem path for `name`, when the backend has one.
    fn local_path(&self, _name: &str) -> Option<PathBuf> {
        None
    }

    /// Read an entry fully as UTF-8 text.
    fn read_to_string(&self, name: &str) -> StorageResult<String> {
        let mut reader = self.open(name)?;
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| StorageError::io(name, e))?;
        Ok(content)
    }
}

/// Reject names that would escape the storage root.
pub(crate) fn check_name(name: &str) -> StorageResult<()> {
    if is_safe_logical_path(name) {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

/// Build the backend selected by `settings`.
///
/// `object_client` supplies the network client for the `object` backend; it
/// is ignored by the other backends.
pub fn build_storage(
    settings: &Settings,
    object_client: Option<Arc<dyn ObjectStore>>,
) -> StorageResult<Arc<dyn Storage>> {
    let root = || -> StorageResult<PathBuf> {
        settings
            .effective_processor_root()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| {
                StorageError::Config(
                    "Neither processor-root nor static-root is set; \
                     compiled stylesheets have nowhere to go"
                        .to_string(),
                )
            })
    };

    match &settings.storage {
        StorageSettings::Filesystem { location, base_url } => {
            let location = match location {
                Some(location) => location.clone(),
                None => root()?,
            };
            let base_url = base_url.clone().unwrap_or_else(|| settings.static_url.clone());
            Ok(Arc::new(FileSystemStorage::new(location, base_url)))
        }
        StorageSettings::Manifest {
            location,
            base_url,
            manifest_name,
        } => {
            let location = match location {
                Some(location) => location.clone(),
                None => root()?,
            };
            let base_url = base_url.clone().unwrap_or_else(|| settings.static_url.clone());
            let manifest_name = manifest_name
                .clone()
                .unwrap_or_else(|| DEFAULT_MANIFEST_NAME.to_string());
            let storage =
                ManifestStorage::open(FileSystemStorage::new(location, base_url), manifest_name)?;
            Ok(Arc::new(storage))
        }
        StorageSettings::Object {
            bucket,
            prefix,
            base_url,
        } => {
            let client = object_client.ok_or_else(|| {
                StorageError::Config(format!(
                    "Storage backend 'object' (bucket {}) needs an object store client",
                    bucket
                ))
            })?;
            let mut storage = ObjectStorage::new(client, bucket.clone());
            if let Some(prefix) = prefix {
                storage = storage.with_prefix(prefix.clone());
            }
            if let Some(base_url) = base_url {
                storage = storage.with_base_url(base_url.clone());
            }
            Ok(Arc::new(storage))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_build_filesystem_from_static_root() {
        let settings = Settings::from_yaml("static-root: out", Path::new("/p")).unwrap();
        let storage = build_storage(&settings, None).unwrap();
        assert_eq!(storage.url("css/a.css"), "/static/css/a.css");
        assert_eq!(
            storage.local_path("css/a.css"),
            Some(PathBuf::from("/p/out/css/a.css"))
        );
    }

    #[test]
    fn test_build_without_root_is_config_error() {
        let settings = Settings::default();
        let err = build_storage(&settings, None).unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }

    #[test]
    fn test_build_object_requires_client() {
        let settings =
            Settings::from_yaml("storage:\n  backend: object\n  bucket: assets", Path::new("/p"))
                .unwrap();
        assert!(matches!(
            build_storage(&settings, None).unwrap_err(),
            StorageError::Config(_)
        ));

        let client: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let storage = build_storage(&settings, Some(client)).unwrap();
        assert_eq!(
            storage.url("css/a.css"),
            "https://assets.s3.amazonaws.com/css/a.css"
        );
    }

    #[test]
    fn test_check_name() {
        assert!(check_name("css/a.css").is_ok());
        assert!(matches!(
            check_name("../a.css"),
            Err(StorageError::InvalidName(_))
        ));
    }
}
