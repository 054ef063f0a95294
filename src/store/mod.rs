//! # Persistent Store Boundary
//!
//! Key → structured-value persistence for the bot. Every record is a
//! [`serde_json::Value`]; callers never see raw bytes.
//!
//! The boundary keeps "key absent" and "backend failed" apart:
//!
//! - [`StoreError::NotFound`] is the only outcome callers are allowed to
//!   recover from by substituting a default (see [`get_or`]).
//! - Every other variant is an IO or encoding failure and propagates.
//!
//! Two backends are provided:
//!
//! - [`SledStore`] - sled-backed, the production backend
//! - [`MemoryStore`] - in-process map, used by tests and scratch runs
//!
//! ## Key layout
//!
//! ```text
//! locations           ordered location table
//! objects             ordered object table
//! admin               list of admin actor ids
//! location~<actor>    actor → location id pointer
//! sitting~<actor>     actor sitting flag (object id)
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use log::trace;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

pub const KEY_LOCATIONS: &str = "locations";
pub const KEY_OBJECTS: &str = "objects";
pub const KEY_ADMIN: &str = "admin";

const TREE_PRIMARY: &str = "roombot";

/// Key holding the location pointer of `actor_id`.
pub fn location_key(actor_id: &str) -> String {
    format!("location~{}", actor_id)
}

/// Key holding the sitting flag of `actor_id`.
pub fn sitting_key(actor_id: &str) -> String {
    format!("sitting~{}", actor_id)
}

/// Errors raised by a [`KvStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key has no value. Recoverable by substituting a default.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Stored bytes did not decode as JSON, or a value failed to encode.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// get/put/delete-by-key over JSON values.
///
/// Every call is a suspension point; callers must not assume two calls
/// observe the same snapshot.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Value, StoreError>;
    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Read `key`, substituting `default` only when the key is absent.
pub async fn get_or(store: &dyn KvStore, key: &str, default: Value) -> Result<Value, StoreError> {
    match store.get(key).await {
        Ok(value) => Ok(value),
        Err(StoreError::NotFound(_)) => {
            trace!("store miss for '{}', using default", key);
            Ok(default)
        }
        Err(e) => Err(e),
    }
}

/// Sled-backed store. Values are encoded as JSON bytes in a single tree.
pub struct SledStore {
    _db: sled::Db,
    primary: sled::Tree,
}

impl SledStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        Ok(Self { _db: db, primary })
    }
}

#[async_trait]
impl KvStore for SledStore {
    async fn get(&self, key: &str) -> Result<Value, StoreError> {
        let Some(bytes) = self.primary.get(key.as_bytes())? else {
            return Err(StoreError::NotFound(key.to_string()));
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(&value)?;
        self.primary.insert(key.as_bytes(), bytes)?;
        self.primary.flush_async().await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.primary.remove(key.as_bytes())?;
        self.primary.flush_async().await?;
        Ok(())
    }
}

/// In-memory store. Deleting an absent key is not an error, matching sled.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Value, StoreError> {
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn sled_round_trip_and_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let store = SledStore::open(dir.path()).expect("store");
        store.put("foo", json!({"a": [1, 2]})).await.expect("put");
        assert_eq!(store.get("foo").await.expect("get"), json!({"a": [1, 2]}));

        store.delete("foo").await.expect("delete");
        let err = store.get("foo").await.unwrap_err();
        assert!(err.is_not_found(), "expected NotFound, got {err:?}");
        assert_eq!(err.to_string(), "record not found: foo");
    }

    #[tokio::test]
    async fn sled_reports_corrupt_values_as_failures() {
        let dir = TempDir::new().expect("tempdir");
        let store = SledStore::open(dir.path()).expect("store");
        store.primary.insert("broken", &b"{not json"[..]).expect("raw insert");
        let err = store.get("broken").await.unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
        // get_or must not paper over a decode failure
        assert!(get_or(&store, "broken", json!(null)).await.is_err());
    }

    #[tokio::test]
    async fn get_or_substitutes_only_on_miss() {
        let store = MemoryStore::new();
        let v = get_or(&store, "admin", json!([])).await.expect("default");
        assert_eq!(v, json!([]));
        store.put("admin", json!(["abc"])).await.expect("put");
        let v = get_or(&store, "admin", json!([])).await.expect("stored");
        assert_eq!(v, json!(["abc"]));
    }

    #[test]
    fn actor_keys() {
        assert_eq!(location_key("abc"), "location~abc");
        assert_eq!(sitting_key("abc"), "sitting~abc");
    }
}
