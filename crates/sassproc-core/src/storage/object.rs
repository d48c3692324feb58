/*
 * object.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Bucket-backed storage over an injected object store client.
 */

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use super::{Storage, StorageError, StorageResult, check_name};
use crate::paths::join_url;

/// Metadata returned by [`ObjectStore::head`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: u64,
    pub last_modified: SystemTime,
}

/// Minimal client surface of a cloud object store.
///
/// The host application supplies the network-backed implementation.
pub trait ObjectStore: Send + Sync + Debug {
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> StorageResult<()>;

    /// Fetch an object body, `None` when the key is absent.
    fn get(&self, bucket: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    fn head(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectMeta>>;

    fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;
}

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    last_modified: SystemTime,
}

/// In-process object store, used for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the modification time of an existing object.
    pub fn set_modified(&self, bucket: &str, key: &str, time: SystemTime) -> bool {
        match self.lock().get_mut(&(bucket.to_string(), key.to_string())) {
            Some(object) => {
                object.last_modified = time;
                true
            }
            None => false,
        }
    }

    /// Keys currently stored in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<(String, String), StoredObject>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> StorageResult<()> {
        self.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.to_vec(),
                last_modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone()))
    }

    fn head(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectMeta>> {
        Ok(self
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| ObjectMeta {
                size: o.body.len() as u64,
                last_modified: o.last_modified,
            }))
    }

    fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.lock().remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

/// Storage that keeps artifacts as objects in one bucket.
#[derive(Debug, Clone)]
pub struct ObjectStorage {
    client: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: String,
    base_url: String,
}

impl ObjectStorage {
    pub fn new(client: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let base_url = format!("https://{}.s3.amazonaws.com/", bucket);
        Self {
            client,
            bucket,
            prefix: String::new(),
            base_url,
        }
    }

    /// Store every key below `prefix/`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key for a logical name.
    pub fn key(&self, name: &str) -> StorageResult<String> {
        check_name(name)?;
        let name = name.trim_start_matches("./");
        if self.prefix.is_empty() {
            Ok(name.to_string())
        } else {
            Ok(format!("{}/{}", self.prefix, name))
        }
    }
}

impl Storage for ObjectStorage {
    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.client.head(&self.bucket, &self.key(name)?)?.is_some())
    }

    fn open(&self, name: &str) -> StorageResult<Box<dyn Read + Send>> {
        match self.client.get(&self.bucket, &self.key(name)?)? {
            Some(body) => Ok(Box::new(Cursor::new(body))),
            None => Err(StorageError::NotFound(name.to_string())),
        }
    }

    fn save(&self, name: &str, content: &[u8]) -> StorageResult<()> {
        self.client.put(&self.bucket, &self.key(name)?, content)
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        self.client.delete(&self.bucket, &self.key(name)?)
    }

    fn url(&self, name: &str) -> String {
        match self.key(name) {
            Ok(key) => join_url(&self.base_url, &key),
            Err(_) => join_url(&self.base_url, name),
        }
    }

    fn modified_time(&self, name: &str) -> StorageResult<SystemTime> {
        self.client
            .head(&self.bucket, &self.key(name)?)?
            .map(|meta| meta.last_modified)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    fn overwrites_in_place(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn storage() -> (Arc<MemoryObjectStore>, ObjectStorage) {
        let client = Arc::new(MemoryObjectStore::new());
        let storage = ObjectStorage::new(client.clone(), "assets").with_prefix("/compiled/");
        (client, storage)
    }

    #[test]
    fn test_roundtrip_through_client() {
        let (client, storage) = storage();
        storage.save("css/main.css", b"a{}").unwrap();

        assert_eq!(client.keys("assets"), vec!["compiled/css/main.css".to_string()]);
        assert!(storage.exists("css/main.css").unwrap());
        assert_eq!(storage.read_to_string("css/main.css").unwrap(), "a{}");

        storage.delete("css/main.css").unwrap();
        assert!(!storage.exists("css/main.css").unwrap());
        assert!(matches!(
            storage.open("css/main.css"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_urls() {
        let (_, storage) = storage();
        assert_eq!(
            storage.url("css/main.css"),
            "https://assets.s3.amazonaws.com/compiled/css/main.css"
        );
        let storage = storage.with_base_url("https://cdn.example.com/");
        assert_eq!(
            storage.url("css/main.css"),
            "https://cdn.example.com/compiled/css/main.css"
        );
    }

    #[test]
    fn test_modified_time_override() {
        let (client, storage) = storage();
        storage.save("a.css", b"").unwrap();
        let past = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        assert!(client.set_modified("assets", "compiled/a.css", past));
        assert_eq!(storage.modified_time("a.css").unwrap(), past);
        assert!(!client.set_modified("assets", "compiled/missing.css", past));
    }
}
