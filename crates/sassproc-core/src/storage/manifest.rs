/*
 * manifest.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Cache-busting storage: content-hashed copies tracked in a JSON manifest.
 */

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{FileSystemStorage, Storage, StorageError, StorageResult};

pub const DEFAULT_MANIFEST_NAME: &str = "manifest.json";

const MANIFEST_VERSION: u32 = 1;

/// Number of hex digits of the content hash embedded in file names.
const HASH_LENGTH: usize = 12;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    paths: BTreeMap<String, String>,
}

/// Insert a short content hash before the final extension of `name`.
///
/// `css/main.css` with content hashing to `0123456789ab...` becomes
/// `css/main.0123456789ab.css`.
pub fn hashed_name(name: &str, content: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(content));
    let hash = &digest[..HASH_LENGTH];

    let (dir, file) = match name.rfind('/') {
        Some(slash) => (&name[..=slash], &name[slash + 1..]),
        None => ("", name),
    };
    match file.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}.{}{}", dir, &file[..dot], hash, &file[dot..]),
        _ => format!("{}{}.{}", dir, file, hash),
    }
}

/// Filesystem storage that also writes hashed copies for far-future caching.
///
/// `url()` returns the hashed copy's URL once one exists, so a changed
/// stylesheet is always served under a new URL.
#[derive(Debug)]
pub struct ManifestStorage {
    inner: FileSystemStorage,
    manifest_name: String,
    manifest: Mutex<Manifest>,
}

impl ManifestStorage {
    /// Wrap `inner`, loading an existing manifest if there is one.
    pub fn open(inner: FileSystemStorage, manifest_name: impl Into<String>) -> StorageResult<Self> {
        let manifest_name = manifest_name.into();
        let manifest = if inner.exists(&manifest_name)? {
            let content = inner.read_to_string(&manifest_name)?;
            let manifest: Manifest = serde_json::from_str(&content).map_err(|e| {
                StorageError::Backend(format!("Unreadable manifest {}: {}", manifest_name, e))
            })?;
            if manifest.version != MANIFEST_VERSION {
                return Err(StorageError::Backend(format!(
                    "Unsupported manifest version {} in {}",
                    manifest.version, manifest_name
                )));
            }
            debug!(entries = manifest.paths.len(), "Loaded storage manifest");
            manifest
        } else {
            Manifest {
                version: MANIFEST_VERSION,
                paths: BTreeMap::new(),
            }
        };

        Ok(Self {
            inner,
            manifest_name,
            manifest: Mutex::new(manifest),
        })
    }

    /// Hashed name recorded for `name`, if any.
    pub fn stored_name(&self, name: &str) -> Option<String> {
        self.lock().paths.get(name).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Manifest> {
        self.manifest.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_manifest(&self, manifest: &Manifest) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| StorageError::Backend(format!("Cannot serialize manifest: {}", e)))?;
        self.inner.save(&self.manifest_name, &json)
    }
}

impl Storage for ManifestStorage {
    fn exists(&self, name: &str) -> StorageResult<bool> {
        self.inner.exists(name)
    }

    fn open(&self, name: &str) -> StorageResult<Box<dyn Read + Send>> {
        self.inner.open(name)
    }

    fn save(&self, name: &str, content: &[u8]) -> StorageResult<()> {
        self.inner.save(name, content)?;

        let hashed = hashed_name(name, content);
        self.inner.save(&hashed, content)?;

        let mut manifest = self.lock();
        if let Some(previous) = manifest.paths.insert(name.to_string(), hashed.clone())
            && previous != hashed
        {
            self.inner.delete(&previous)?;
        }
        self.write_manifest(&manifest)
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        let mut manifest = self.lock();
        if let Some(hashed) = manifest.paths.remove(name) {
            if let Err(e) = self.inner.delete(&hashed) {
                warn!(name = %hashed, error = %e, "Could not remove hashed copy");
            }
            self.write_manifest(&manifest)?;
        }
        drop(manifest);
        self.inner.delete(name)
    }

    fn url(&self, name: &str) -> String {
        match self.stored_name(name) {
            Some(hashed) => self.inner.url(&hashed),
            None => self.inner.url(name),
        }
    }

    fn modified_time(&self, name: &str) -> StorageResult<SystemTime> {
        self.inner.modified_time(name)
    }

    fn local_path(&self, name: &str) -> Option<PathBuf> {
        self.inner.local_path(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hashed_name() {
        let hashed = hashed_name("css/main.css", b"a{}");
        assert!(hashed.starts_with("css/main."));
        assert!(hashed.ends_with(".css"));
        assert_eq!(hashed.len(), "css/main..css".len() + HASH_LENGTH);

        let map = hashed_name("main.css.map", b"{}");
        assert!(map.starts_with("main.css."));
        assert!(map.ends_with(".map"));

        assert_ne!(hashed_name("a.css", b"1"), hashed_name("a.css", b"2"));
    }

    #[test]
    fn test_save_writes_hashed_copy_and_manifest() {
        let temp = tempfile::tempdir().unwrap();
        let storage = ManifestStorage::open(
            FileSystemStorage::new(temp.path(), "/static/"),
            DEFAULT_MANIFEST_NAME,
        )
        .unwrap();

        storage.save("css/main.css", b".a{b:c}").unwrap();
        let hashed = storage.stored_name("css/main.css").unwrap();
        assert!(temp.path().join(&hashed).is_file());
        assert_eq!(storage.url("css/main.css"), format!("/static/{}", hashed));

        let manifest: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join("manifest.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest["version"], 1);
        assert_eq!(manifest["paths"]["css/main.css"], hashed.as_str());
    }

    #[test]
    fn test_resave_replaces_old_hashed_copy() {
        let temp = tempfile::tempdir().unwrap();
        let storage = ManifestStorage::open(
            FileSystemStorage::new(temp.path(), "/static/"),
            DEFAULT_MANIFEST_NAME,
        )
        .unwrap();

        storage.save("main.css", b"one").unwrap();
        let first = storage.stored_name("main.css").unwrap();
        storage.save("main.css", b"two").unwrap();
        let second = storage.stored_name("main.css").unwrap();

        assert_ne!(first, second);
        assert!(!temp.path().join(&first).exists());
        assert!(temp.path().join(&second).exists());
    }

    #[test]
    fn test_delete_and_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let open = || {
            ManifestStorage::open(
                FileSystemStorage::new(temp.path(), "/static/"),
                DEFAULT_MANIFEST_NAME,
            )
            .unwrap()
        };

        let storage = open();
        storage.save("a.css", b"a").unwrap();
        storage.save("b.css", b"b").unwrap();
        let hashed_a = storage.stored_name("a.css").unwrap();
        storage.delete("a.css").unwrap();
        assert!(!temp.path().join("a.css").exists());
        assert!(!temp.path().join(&hashed_a).exists());

        let reopened = open();
        assert_eq!(reopened.stored_name("a.css"), None);
        assert!(reopened.stored_name("b.css").is_some());
        assert_eq!(reopened.url("a.css"), "/static/a.css");
    }

    #[test]
    fn test_rejects_unknown_manifest_version() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("manifest.json"),
            r#"{"version": 9, "paths": {}}"#,
        )
        .unwrap();
        let err = ManifestStorage::open(
            FileSystemStorage::new(temp.path(), "/static/"),
            DEFAULT_MANIFEST_NAME,
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }
}
