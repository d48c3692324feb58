/*
 * lazy.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Storage that is built on first access.
 */

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

use tracing::{debug, error};

use super::{ObjectStore, Storage, StorageError, StorageResult, build_storage};
use crate::config::Settings;

/// Builds the real backend.
pub type StorageFactory = Box<dyn Fn() -> StorageResult<Arc<dyn Storage>> + Send + Sync>;

/// Defers construction of a backend until something first touches it.
///
/// The factory runs at most once. A failed construction is remembered and
/// reported as a configuration error on every later access.
pub struct LazyStorage {
    factory: StorageFactory,
    cell: OnceLock<Result<Arc<dyn Storage>, String>>,
}

impl LazyStorage {
    pub fn new(factory: StorageFactory) -> Self {
        Self {
            factory,
            cell: OnceLock::new(),
        }
    }

    /// Lazily build the backend selected by `settings`.
    pub fn from_settings(settings: Settings, object_client: Option<Arc<dyn ObjectStore>>) -> Self {
        Self::new(Box::new(move || {
            build_storage(&settings, object_client.clone())
        }))
    }

    /// Wrap an already-built backend.
    pub fn ready(storage: Arc<dyn Storage>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Ok(storage));
        Self {
            factory: Box::new(|| Err(StorageError::Config("storage already built".to_string()))),
            cell,
        }
    }

    /// Whether the backend has been constructed (successfully or not).
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The backend, building it on first call.
    pub fn get(&self) -> StorageResult<Arc<dyn Storage>> {
        let result = self.cell.get_or_init(|| match (self.factory)() {
            Ok(storage) => {
                debug!(backend = ?storage, "Storage initialized");
                Ok(storage)
            }
            Err(e) => {
                error!(error = %e, "Storage initialization failed");
                Err(e.to_string())
            }
        });
        match result {
            Ok(storage) => Ok(storage.clone()),
            Err(message) => Err(StorageError::Config(message.clone())),
        }
    }
}

impl fmt::Debug for LazyStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.cell.get() {
            None => "uninitialized",
            Some(Ok(_)) => "ready",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("LazyStorage").field("state", &state).finish()
    }
}

impl Storage for LazyStorage {
    fn exists(&self, name: &str) -> StorageResult<bool> {
        self.get()?.exists(name)
    }

    fn open(&self, name: &str) -> StorageResult<Box<dyn Read + Send>> {
        self.get()?.open(name)
    }

    fn save(&self, name: &str, content: &[u8]) -> StorageResult<()> {
        self.get()?.save(name, content)
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        self.get()?.delete(name)
    }

    fn url(&self, name: &str) -> String {
        match self.get() {
            Ok(storage) => storage.url(name),
            Err(_) => name.to_string(),
        }
    }

    fn modified_time(&self, name: &str) -> StorageResult<SystemTime> {
        self.get()?.modified_time(name)
    }

    fn overwrites_in_place(&self) -> bool {
        self.get().is_ok_and(|s| s.overwrites_in_place())
    }

    fn local_path(&self, name: &str) -> Option<PathBuf> {
        self.get().ok().and_then(|s| s.local_path(name))
    }
}
